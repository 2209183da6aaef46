//! # devhost Mirror
//!
//! Best-effort mirroring of devhost documents to a remote repository
//! through its contents API.
//!
//! This crate provides:
//! - [`MirrorClient`]: optimistic-concurrency create-or-update of one file
//! - [`MirrorWorker`]: a [`devhost_store::CommitObserver`] that mirrors
//!   guestbook commits from a background thread
//! - [`HttpClient`]: transport abstraction, with [`UreqClient`] for real
//!   traffic and [`MockHttpClient`] for tests
//! - [`MirrorConfig`]: explicit configuration, optionally read from the
//!   environment once at startup
//!
//! ## Key Invariants
//!
//! - A put is only attempted after a lookup answered 2xx or 404
//! - Existing files are only overwritten with their current content hash
//! - Nothing is retried, and no failure propagates to the local writer

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod config;
mod error;
mod http;
mod worker;

pub use client::{MirrorClient, PutOutcome};
pub use config::{
    MirrorConfig, DEFAULT_API_BASE, DEFAULT_REMOTE_PATH, ENV_API_URL, ENV_BRANCH, ENV_REMOTE_PATH,
    ENV_REPO, ENV_TOKEN,
};
pub use error::{MirrorError, MirrorResult, Stage};
pub use http::{HttpClient, HttpResponse, MockHttpClient, RecordedRequest, UreqClient};
pub use worker::{MirrorStats, MirrorWorker};
