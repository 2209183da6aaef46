//! Request routing and handlers.
//!
//! Handlers are independent of the HTTP library: they take a method, a
//! request target and a body, and produce a [`Reply`] that the server
//! writes out.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::statics;
use devhost_store::{CommitObserver, GuestbookStore, NewEntry, SnapshotStore};
use percent_encoding::percent_decode_str;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Body returned by every successful mutation.
pub const OK_BODY: &str = "ok";

/// Body returned for unknown POST and DELETE targets.
pub const NOT_FOUND_BODY: &str = "not-found";

/// Request methods the dispatcher distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// HEAD, answered like GET.
    Head,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// Anything else.
    Other(String),
}

impl From<&str> for Method {
    fn from(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Head => f.write_str("HEAD"),
            Method::Post => f.write_str("POST"),
            Method::Delete => f.write_str("DELETE"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `POST /guestbook`
    AppendEntry,
    /// `DELETE /guestbook/{id}`, with the last path segment decoded as the id.
    RemoveEntry(String),
    /// `POST /guestbook/upload`
    UploadGuestbook,
    /// `POST /reset-build`
    ResetBuild,
    /// `POST /upload-filetree`
    UploadFiletree,
    /// `GET /*`, with the raw path.
    Static(String),
}

impl Route {
    /// Resolves a request target. The query string is ignored.
    pub fn resolve(method: &Method, target: &str) -> ServerResult<Route> {
        let path = target.split(['?', '#']).next().unwrap_or_default();

        match method {
            Method::Get | Method::Head => Ok(Route::Static(path.to_string())),
            Method::Post => match path {
                "/guestbook" => Ok(Route::AppendEntry),
                "/guestbook/upload" => Ok(Route::UploadGuestbook),
                "/reset-build" => Ok(Route::ResetBuild),
                "/upload-filetree" => Ok(Route::UploadFiletree),
                _ => Err(ServerError::NotRoutable(path.to_string())),
            },
            Method::Delete => {
                // The id is the last segment, which may be empty.
                let id = path
                    .strip_prefix("/guestbook/")
                    .and_then(|rest| rest.rsplit('/').next())
                    .ok_or_else(|| ServerError::NotRoutable(path.to_string()))?;
                let id = percent_decode_str(id).decode_utf8_lossy().into_owned();
                Ok(Route::RemoveEntry(id))
            }
            Method::Other(m) => Err(ServerError::MethodNotAllowed(m.clone())),
        }
    }
}

/// What to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A plain-text response.
    Text {
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },
    /// A file from the project root.
    File {
        /// Resolved file path.
        path: PathBuf,
        /// Content type guessed from the extension.
        content_type: &'static str,
    },
}

impl Reply {
    /// A 200 `ok` reply.
    pub fn ok() -> Self {
        Reply::Text {
            status: 200,
            body: OK_BODY.to_string(),
        }
    }

    /// Builds the reply for a failed request.
    pub fn from_error(err: &ServerError) -> Self {
        let body = match err {
            ServerError::NotRoutable(_) => NOT_FOUND_BODY.to_string(),
            other => other.to_string(),
        };
        Reply::Text {
            status: err.status_code(),
            body,
        }
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> u16 {
        match self {
            Reply::Text { status, .. } => *status,
            Reply::File { .. } => 200,
        }
    }
}

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Guestbook document.
    pub guestbook: GuestbookStore,
    /// Filetree snapshot document.
    pub snapshot: SnapshotStore,
}

impl HandlerContext {
    /// Creates a context whose stores live under the configured root.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_observers(config, Vec::new())
    }

    /// Creates a context whose guestbook notifies `observers` after every
    /// committed change.
    pub fn with_observers(config: ServerConfig, observers: Vec<Arc<dyn CommitObserver>>) -> Self {
        let guestbook = observers
            .into_iter()
            .fold(GuestbookStore::new(config.guestbook_path()), |store, observer| {
                store.with_observer(observer)
            });
        let snapshot = SnapshotStore::new(config.filetree_path());
        Self {
            config,
            guestbook,
            snapshot,
        }
    }
}

/// Handler for development server requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Returns the handler context.
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Routes and handles one request, turning failures into replies.
    pub fn handle(&self, method: &Method, target: &str, body: &[u8]) -> Reply {
        match Route::resolve(method, target).and_then(|route| self.dispatch(route, body)) {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_server_error() {
                    tracing::error!(%method, url = target, error = %err, "request failed");
                } else {
                    tracing::debug!(%method, url = target, error = %err, "request rejected");
                }
                Reply::from_error(&err)
            }
        }
    }

    /// Executes a resolved route.
    pub fn dispatch(&self, route: Route, body: &[u8]) -> ServerResult<Reply> {
        match route {
            Route::AppendEntry => self.handle_append(body),
            Route::RemoveEntry(id) => self.handle_remove(&id),
            Route::UploadGuestbook => self.handle_upload_guestbook(body),
            Route::ResetBuild => self.handle_reset_build(),
            Route::UploadFiletree => self.handle_upload_filetree(body),
            Route::Static(path) => self.handle_static(&path),
        }
    }

    fn handle_append(&self, body: &[u8]) -> ServerResult<Reply> {
        let submission = NewEntry::from_json(body)?;
        self.context.guestbook.append(submission)?;
        Ok(Reply::ok())
    }

    fn handle_remove(&self, id: &str) -> ServerResult<Reply> {
        self.context.guestbook.remove(id)?;
        Ok(Reply::ok())
    }

    fn handle_upload_guestbook(&self, body: &[u8]) -> ServerResult<Reply> {
        self.context.guestbook.replace(body)?;
        Ok(Reply::ok())
    }

    fn handle_reset_build(&self) -> ServerResult<Reply> {
        self.context.snapshot.reset_build_marker()?;
        Ok(Reply::ok())
    }

    fn handle_upload_filetree(&self, body: &[u8]) -> ServerResult<Reply> {
        self.context.snapshot.replace(body)?;
        Ok(Reply::ok())
    }

    fn handle_static(&self, path: &str) -> ServerResult<Reply> {
        let file = statics::resolve(self.context.config.root(), path)
            .ok_or_else(|| ServerError::NotRoutable(path.to_string()))?;
        let content_type = statics::content_type(&file);
        Ok(Reply::File {
            path: file,
            content_type,
        })
    }
}
