//! HTTP listener for the development server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, Method, Reply, RequestHandler};
use std::fs::File;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Request, Response, Server};

/// The development server: a listener plus the request handler.
pub struct DevServer {
    listener: Arc<Server>,
    handler: Arc<RequestHandler>,
    addr: SocketAddr,
}

impl DevServer {
    /// Binds a server with stores under the configured root.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind(config: ServerConfig) -> ServerResult<Self> {
        Self::with_context(HandlerContext::new(config))
    }

    /// Binds a server around a prepared context.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn with_context(context: HandlerContext) -> ServerResult<Self> {
        let listener = Server::http(context.config.bind_addr)
            .map_err(|e| ServerError::Bind(format!("{}: {e}", context.config.bind_addr)))?;
        let addr = listener
            .server_addr()
            .to_ip()
            .ok_or_else(|| ServerError::Bind("listener has no IP address".into()))?;

        Ok(Self {
            listener: Arc::new(listener),
            handler: Arc::new(RequestHandler::new(Arc::new(context))),
            addr,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns a handle that stops [`DevServer::run`].
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            listener: Arc::clone(&self.listener),
        }
    }

    /// Accepts requests until shut down, each on its own thread.
    pub fn run(&self) {
        tracing::info!(addr = %self.addr, root = %self.handler.context().config.root().display(), "serving");

        for request in self.listener.incoming_requests() {
            let handler = Arc::clone(&self.handler);
            let spawned = thread::Builder::new()
                .name("devhost-request".into())
                .spawn(move || serve(&handler, request));
            if let Err(err) = spawned {
                tracing::error!(error = %err, "failed to spawn request thread");
            }
        }

        tracing::info!("server stopped");
    }

    /// Runs the server on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self) -> io::Result<RunningServer> {
        let addr = self.addr;
        let shutdown = self.shutdown_handle();
        let thread = thread::Builder::new()
            .name("devhost-server".into())
            .spawn(move || self.run())?;
        Ok(RunningServer {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Stops a running [`DevServer`].
#[derive(Clone)]
pub struct ShutdownHandle {
    listener: Arc<Server>,
}

impl ShutdownHandle {
    /// Wakes the accept loop so that it exits.
    pub fn shutdown(&self) {
        self.listener.unblock();
    }
}

/// A server running on a background thread. Dropping it stops the server.
pub struct RunningServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl RunningServer {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the base URL, e.g. `http://127.0.0.1:8000`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stops the server and waits for the accept loop to exit.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.shutdown.shutdown();
            if thread.join().is_err() {
                tracing::error!("server thread panicked");
            }
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.halt();
    }
}

fn serve(handler: &RequestHandler, mut request: Request) {
    let method = Method::from(request.method().as_str());
    let url = request.url().to_string();
    let limit = handler.context().config.max_body_bytes;

    let reply = match read_body(&mut request, limit) {
        Ok(body) => handler.handle(&method, &url, &body),
        Err(err) => {
            tracing::warn!(%method, url, error = %err, "failed to read request body");
            Reply::from_error(&err)
        }
    };

    let status = reply.status();
    if let Err(err) = respond(request, reply) {
        tracing::debug!(%method, url, error = %err, "failed to write response");
    }
    tracing::info!(%method, url, status, "request");
}

fn read_body(request: &mut Request, limit: usize) -> ServerResult<Vec<u8>> {
    if request.body_length().is_some_and(|len| len > limit) {
        return Err(ServerError::PayloadTooLarge { limit });
    }

    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() > limit {
        return Err(ServerError::PayloadTooLarge { limit });
    }
    Ok(body)
}

fn respond(request: Request, reply: Reply) -> io::Result<()> {
    match reply {
        Reply::Text { status, body } => {
            request.respond(Response::from_string(body).with_status_code(status))
        }
        Reply::File { path, content_type } => match File::open(&path) {
            Ok(file) => {
                let mut response = Response::from_file(file);
                add_content_type(&mut response, content_type);
                request.respond(response)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to open static file");
                let status = if err.kind() == io::ErrorKind::NotFound { 404 } else { 500 };
                request.respond(Response::from_string(err.to_string()).with_status_code(status))
            }
        },
    }
}

fn add_content_type<R: Read>(response: &mut Response<R>, value: &str) {
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], value.as_bytes()) {
        response.add_header(header);
    }
}
