//! Optimistic-concurrency writes against a remote content API.
//!
//! Updating an existing file requires its current content hash. A put is
//! therefore two requests:
//!
//! 1. `GET` the file's metadata. 2xx yields the current `sha`; 404 means
//!    the file does not exist yet. Any other answer aborts the put.
//! 2. `PUT` the new base64 content, echoing the `sha` when one was found.
//!    The remote rejects the write if the file changed in between.
//!
//! Neither request is retried.

use crate::config::MirrorConfig;
use crate::error::{MirrorError, MirrorResult, Stage};
use crate::http::{HttpClient, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Result of a successful put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The file did not exist and was created.
    Created {
        /// New content hash, if the remote reported one.
        sha: Option<String>,
    },
    /// An existing file was overwritten.
    Updated {
        /// Hash the write was conditioned on.
        previous_sha: String,
        /// New content hash, if the remote reported one.
        sha: Option<String>,
    },
}

impl PutOutcome {
    /// Returns the new content hash, if known.
    pub fn sha(&self) -> Option<&str> {
        match self {
            PutOutcome::Created { sha } | PutOutcome::Updated { sha, .. } => sha.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct ContentMetadata {
    sha: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: Option<ContentMetadata>,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Client for the remote repository's contents API.
pub struct MirrorClient<C: HttpClient> {
    config: MirrorConfig,
    client: C,
}

impl<C: HttpClient> MirrorClient<C> {
    /// Creates a client.
    pub fn new(config: MirrorConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Creates or overwrites `path` in the repository with `content`.
    ///
    /// # Errors
    ///
    /// Returns a [`MirrorError`] if the lookup answers anything other than
    /// 2xx or 404 (no put is attempted then), or if the put does not answer
    /// 2xx.
    pub fn put_file(&self, path: &str, content: &[u8], message: &str) -> MirrorResult<PutOutcome> {
        let authorization = format!("Bearer {}", self.config.token);
        let headers = [
            ("Authorization", authorization.as_str()),
            ("Accept", ACCEPT),
            ("User-Agent", self.config.user_agent.as_str()),
            ("X-GitHub-Api-Version", API_VERSION),
        ];

        let previous_sha = self.current_sha(path, &headers)?;

        let request = PutRequest {
            message,
            content: STANDARD.encode(content),
            sha: previous_sha.as_deref(),
            branch: self.config.branch.as_deref(),
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| MirrorError::Protocol(format!("failed to encode put request: {e}")))?;

        let mut put_headers = headers.to_vec();
        put_headers.push(("Content-Type", "application/json"));
        let url = self.config.contents_url(path);
        let response = self
            .client
            .put(&url, &put_headers, body)
            .map_err(|message| MirrorError::Transport {
                stage: Stage::Put,
                message,
            })?;
        if !response.is_success() {
            return Err(status_error(Stage::Put, &response));
        }

        // The new hash is informational; a body we cannot read does not undo the write.
        let sha = serde_json::from_slice::<PutResponse>(&response.body)
            .ok()
            .and_then(|parsed| parsed.content)
            .map(|content| content.sha);

        tracing::debug!(path, repository = %self.config.repository(), status = response.status, "mirror put accepted");
        Ok(match previous_sha {
            Some(previous_sha) => PutOutcome::Updated { previous_sha, sha },
            None => PutOutcome::Created { sha },
        })
    }

    /// Fetches the current content hash of `path`, `None` if it does not exist.
    fn current_sha(&self, path: &str, headers: &[(&str, &str)]) -> MirrorResult<Option<String>> {
        let url = self.config.lookup_url(path);
        let response = self
            .client
            .get(&url, headers)
            .map_err(|message| MirrorError::Transport {
                stage: Stage::Lookup,
                message,
            })?;

        match response.status {
            404 => Ok(None),
            _ if response.is_success() => {
                let metadata: ContentMetadata = serde_json::from_slice(&response.body)
                    .map_err(|e| MirrorError::Protocol(format!("unexpected lookup response: {e}")))?;
                Ok(Some(metadata.sha))
            }
            _ => Err(status_error(Stage::Lookup, &response)),
        }
    }
}

fn status_error(stage: Stage, response: &HttpResponse) -> MirrorError {
    MirrorError::Status {
        stage,
        status: response.status,
        body: response.body_snippet(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use serde_json::Value;
    use std::sync::Arc;

    fn client() -> (Arc<MockHttpClient>, MirrorClient<Arc<MockHttpClient>>) {
        let mock = Arc::new(MockHttpClient::new());
        let config = MirrorConfig::new("tok", "octo/site").unwrap();
        (Arc::clone(&mock), MirrorClient::new(config, mock))
    }

    fn put_body(mock: &MockHttpClient) -> Value {
        let requests = mock.requests();
        let put = requests.iter().find(|r| r.method == "PUT").expect("a put was sent");
        serde_json::from_slice(put.body.as_ref().unwrap()).unwrap()
    }

    #[test]
    fn creates_when_lookup_reports_not_found() {
        let (mock, client) = client();
        mock.push_response(404, r#"{"message": "Not Found"}"#);
        mock.push_response(201, r#"{"content": {"sha": "new"}}"#);

        let outcome = client.put_file("guestbook.json", b"[]", "sync guestbook").unwrap();
        assert_eq!(outcome, PutOutcome::Created { sha: Some("new".into()) });

        let body = put_body(&mock);
        assert_eq!(body["message"], "sync guestbook");
        assert_eq!(body["content"], "W10=");
        assert!(body.get("sha").is_none());
        assert!(body.get("branch").is_none());
    }

    #[test]
    fn updates_with_current_sha() {
        let (mock, client) = client();
        mock.push_response(200, r#"{"sha": "abc123", "name": "guestbook.json"}"#);
        mock.push_response(200, r#"{"content": {"sha": "def456"}}"#);

        let outcome = client.put_file("guestbook.json", b"[1]", "update").unwrap();
        assert_eq!(
            outcome,
            PutOutcome::Updated {
                previous_sha: "abc123".into(),
                sha: Some("def456".into())
            }
        );
        assert_eq!(outcome.sha(), Some("def456"));
        assert_eq!(put_body(&mock)["sha"], "abc123");
    }

    #[test]
    fn lookup_server_error_aborts_without_put() {
        let (mock, client) = client();
        mock.push_response(500, "internal");

        let err = client.put_file("guestbook.json", b"[]", "m").unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Status {
                stage: Stage::Lookup,
                status: 500,
                ..
            }
        ));
        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
    }

    #[test]
    fn lookup_transport_failure_aborts() {
        let (mock, client) = client();
        mock.push_failure("connection refused");

        let err = client.put_file("guestbook.json", b"[]", "m").unwrap_err();
        assert!(matches!(err, MirrorError::Transport { stage: Stage::Lookup, .. }));
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn unreadable_lookup_body_is_protocol_error() {
        let (mock, client) = client();
        mock.push_response(200, "<html>");

        let err = client.put_file("guestbook.json", b"[]", "m").unwrap_err();
        assert!(matches!(err, MirrorError::Protocol(_)));
    }

    #[test]
    fn rejected_put_is_an_error() {
        let (mock, client) = client();
        mock.push_response(200, r#"{"sha": "stale"}"#);
        mock.push_response(409, r#"{"message": "sha does not match"}"#);

        let err = client.put_file("guestbook.json", b"[]", "m").unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(err, MirrorError::Status { stage: Stage::Put, .. }));
    }

    #[test]
    fn put_without_readable_body_still_succeeds() {
        let (mock, client) = client();
        mock.push_response(404, "");
        mock.push_response(201, "");

        let outcome = client.put_file("guestbook.json", b"[]", "m").unwrap();
        assert_eq!(outcome, PutOutcome::Created { sha: None });
    }

    #[test]
    fn requests_carry_auth_and_branch() {
        let mock = Arc::new(MockHttpClient::new());
        let config = MirrorConfig::new("tok", "octo/site").unwrap().with_branch("pages");
        let client = MirrorClient::new(config, Arc::clone(&mock));
        mock.push_response(404, "");
        mock.push_response(201, "");

        client.put_file("data/guestbook.json", b"[]", "m").unwrap();

        let requests = mock.requests();
        assert_eq!(
            requests[0].url,
            "https://api.github.com/repos/octo/site/contents/data/guestbook.json?ref=pages"
        );
        assert_eq!(
            requests[1].url,
            "https://api.github.com/repos/octo/site/contents/data/guestbook.json"
        );
        for request in &requests {
            assert_eq!(request.header("Authorization"), Some("Bearer tok"));
            assert!(request.header("User-Agent").is_some());
        }
        assert_eq!(requests[1].header("Content-Type"), Some("application/json"));
        assert_eq!(put_body(&mock)["branch"], "pages");
    }
}
