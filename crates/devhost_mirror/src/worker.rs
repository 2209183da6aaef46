//! Background mirroring of committed documents.
//!
//! [`MirrorWorker`] is a [`CommitObserver`]: stores hand it commits on the
//! request thread, it forwards them over a channel, and a single
//! background thread performs the remote puts. A burst of commits queued
//! behind a slow put collapses into one put of the newest contents, since
//! each commit carries the whole document.

use crate::client::MirrorClient;
use crate::http::HttpClient;
use devhost_store::{Commit, CommitObserver};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Counters describing the worker's activity.
#[derive(Debug, Default)]
pub struct MirrorStats {
    pushed: AtomicU64,
    failed: AtomicU64,
    superseded: AtomicU64,
}

impl MirrorStats {
    /// Puts accepted by the remote.
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::SeqCst)
    }

    /// Puts that failed.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Commits skipped because a newer one was already queued.
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::SeqCst)
    }
}

/// Forwards commits to a background thread that mirrors them remotely.
pub struct MirrorWorker {
    sender: Option<Sender<Commit>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<MirrorStats>,
}

impl MirrorWorker {
    /// Starts the background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<C>(client: MirrorClient<C>) -> io::Result<Self>
    where
        C: HttpClient + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let stats = Arc::new(MirrorStats::default());
        let thread_stats = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name("devhost-mirror".into())
            .spawn(move || run(&client, &receiver, &thread_stats))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            stats,
        })
    }

    /// Returns the activity counters.
    pub fn stats(&self) -> &MirrorStats {
        &self.stats
    }

    /// Stops accepting commits, waits for queued ones to be mirrored, and
    /// returns the final counters.
    pub fn shutdown(mut self) -> Arc<MirrorStats> {
        self.stop();
        Arc::clone(&self.stats)
    }

    fn stop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("mirror worker panicked");
            }
        }
    }
}

impl CommitObserver for MirrorWorker {
    fn on_commit(&self, commit: &Commit) {
        let Some(sender) = &self.sender else {
            return;
        };
        if sender.send(commit.clone()).is_err() {
            tracing::warn!(document = %commit.document, "mirror worker is gone, dropping commit");
        }
    }
}

impl Drop for MirrorWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<C: HttpClient>(client: &MirrorClient<C>, receiver: &Receiver<Commit>, stats: &MirrorStats) {
    let remote_path = client.config().remote_path.clone();
    tracing::info!(repository = %client.config().repository(), path = %remote_path, "mirror worker started");

    while let Ok(mut commit) = receiver.recv() {
        // Only the newest contents matter; skip anything it supersedes.
        let mut skipped = 0u64;
        while let Ok(newer) = receiver.try_recv() {
            commit = newer;
            skipped += 1;
        }
        if skipped > 0 {
            stats.superseded.fetch_add(skipped, Ordering::SeqCst);
            commit.message = format!("{} (+{skipped} earlier changes)", commit.message);
        }

        match client.put_file(&remote_path, &commit.contents, &commit.message) {
            Ok(outcome) => {
                stats.pushed.fetch_add(1, Ordering::SeqCst);
                tracing::info!(
                    document = %commit.document,
                    path = %remote_path,
                    sha = outcome.sha().unwrap_or("-"),
                    "mirrored"
                );
            }
            Err(err) => {
                stats.failed.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(document = %commit.document, path = %remote_path, error = %err, "mirror failed");
            }
        }
    }

    tracing::debug!("mirror worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::http::MockHttpClient;
    use devhost_store::{GuestbookStore, NewEntry};
    use tempfile::tempdir;

    fn commit(message: &str, contents: &[u8]) -> Commit {
        Commit {
            document: "guestbook.json".into(),
            contents: contents.to_vec(),
            message: message.into(),
        }
    }

    fn worker(mock: &Arc<MockHttpClient>) -> MirrorWorker {
        let config = MirrorConfig::new("tok", "octo/site").unwrap();
        MirrorWorker::spawn(MirrorClient::new(config, Arc::clone(mock))).unwrap()
    }

    #[test]
    fn mirrors_commits() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(404, "");
        mock.push_response(201, r#"{"content": {"sha": "s1"}}"#);

        let worker = worker(&mock);
        worker.on_commit(&commit("first", b"[]"));
        let stats = worker.shutdown();

        assert_eq!(stats.pushed(), 1);
        assert_eq!(stats.failed(), 0);
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].url.ends_with("/contents/guestbook.json"));
    }

    #[test]
    fn failures_are_counted_not_raised() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(503, "unavailable");

        let worker = worker(&mock);
        worker.on_commit(&commit("first", b"[]"));
        let stats = worker.shutdown();

        assert_eq!(stats.pushed(), 0);
        assert_eq!(stats.failed(), 1);
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn every_commit_is_accounted_for() {
        let mock = Arc::new(MockHttpClient::new());
        for _ in 0..5 {
            mock.push_response(404, "");
            mock.push_response(201, "");
        }

        let worker = worker(&mock);
        for i in 0..5 {
            worker.on_commit(&commit(&format!("c{i}"), format!("[{i}]").as_bytes()));
        }
        let stats = worker.shutdown();

        assert_eq!(stats.pushed() + stats.superseded(), 5);
        let last_put = mock
            .requests()
            .into_iter()
            .filter(|r| r.method == "PUT")
            .last()
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&last_put.body.unwrap()).unwrap();
        assert_eq!(body["content"], "WzRd");
    }

    #[test]
    fn store_writes_reach_the_remote() {
        let temp = tempdir().unwrap();
        let mock = Arc::new(MockHttpClient::new());
        mock.push_response(404, "");
        mock.push_response(201, "");

        let worker = Arc::new(worker(&mock));
        let store = GuestbookStore::in_root(temp.path()).with_observer(worker.clone());
        store.append(NewEntry::new("Ann", "hi")).unwrap();
        drop(store);

        let worker = Arc::try_unwrap(worker).ok().expect("store released the worker");
        let stats = worker.shutdown();
        assert_eq!(stats.pushed(), 1);

        let put = mock.requests().into_iter().find(|r| r.method == "PUT").unwrap();
        let body: serde_json::Value = serde_json::from_slice(&put.body.unwrap()).unwrap();
        assert!(body["message"].as_str().unwrap().contains("from Ann"));
    }
}
