//! # devhost Server
//!
//! Local development HTTP server: serves static files from a project root
//! and exposes write endpoints for the guestbook and filetree documents.
//!
//! ## Endpoints
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | POST | `/guestbook` | append an entry |
//! | DELETE | `/guestbook/{id}` | remove entries with that id |
//! | POST | `/guestbook/upload` | replace the guestbook with a JSON array |
//! | POST | `/reset-build` | reset the snapshot's build marker |
//! | POST | `/upload-filetree` | replace the snapshot verbatim |
//! | GET | `/*` | static file under the root |
//!
//! Mutations answer `200 ok`. Failures answer with a plain-text reason and
//! the status from [`ServerError::status_code`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use devhost_server::{DevServer, ServerConfig};
//!
//! let server = DevServer::bind(ServerConfig::new("./site"))?;
//! println!("listening on {}", server.local_addr());
//! server.run();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod statics;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, Method, Reply, RequestHandler, Route, NOT_FOUND_BODY, OK_BODY};
pub use server::{DevServer, RunningServer, ShutdownHandle};
pub use statics::{content_type, resolve as resolve_static, INDEX_FILE};
