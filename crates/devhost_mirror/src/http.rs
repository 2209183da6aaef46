//! HTTP client abstraction.
//!
//! The mirror talks to the remote through the [`HttpClient`] trait so that
//! tests can script responses without a network. [`UreqClient`] is the
//! production implementation.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how much of a response body is read.
const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// A response from the remote, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the start of the body as text, for error messages.
    pub fn body_snippet(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let mut snippet: String = text.chars().take(200).collect();
        if text.chars().count() > 200 {
            snippet.push_str("...");
        }
        snippet
    }
}

/// HTTP client abstraction.
///
/// Implementations return `Ok` for every response the server sent,
/// including 4xx/5xx ones, and `Err` only when no response was received
/// (connection failure, timeout, TLS error).
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, String>;

    /// Sends a PUT request with a body.
    fn put(&self, url: &str, headers: &[(&str, &str)], body: Vec<u8>) -> Result<HttpResponse, String>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, String> {
        (**self).get(url, headers)
    }

    fn put(&self, url: &str, headers: &[(&str, &str)], body: Vec<u8>) -> Result<HttpResponse, String> {
        (**self).put(url, headers, body)
    }
}

/// [`HttpClient`] backed by a blocking `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self { agent }
    }

    fn send(&self, request: ureq::Request, body: Option<&[u8]>) -> Result<HttpResponse, String> {
        let result = match body {
            Some(body) => request.send_bytes(body),
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(transport.to_string()),
        };

        let status = response.status();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| format!("failed to read response body: {e}"))?;
        Ok(HttpResponse { status, body })
    }
}

fn with_headers(mut request: ureq::Request, headers: &[(&str, &str)]) -> ureq::Request {
    for (name, value) in headers {
        request = request.set(name, value);
    }
    request
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, String> {
        self.send(with_headers(self.agent.get(url), headers), None)
    }

    fn put(&self, url: &str, headers: &[(&str, &str)], body: Vec<u8>) -> Result<HttpResponse, String> {
        self.send(with_headers(self.agent.put(url), headers), Some(&body))
    }
}

/// A request captured by [`MockHttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// `GET` or `PUT`.
    pub method: &'static str,
    /// Request URL.
    pub url: String,
    /// Request headers, in the order given.
    pub headers: Vec<(String, String)>,
    /// Request body (PUT only).
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// Returns the value of a header (case-insensitive name match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A scripted HTTP client for testing.
///
/// Responses are returned in the order they were queued, regardless of
/// method or URL. When the queue is empty every request fails with a
/// transport error.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    /// Creates a client with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.responses.lock().push_back(Ok(HttpResponse::new(status, body)));
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses.lock().push_back(Err(message.into()));
    }

    /// Returns all requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn respond(
        &self,
        method: &'static str,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, String> {
        self.requests.lock().push(RecordedRequest {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        });
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err("no mock response queued".into()))
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, String> {
        self.respond("GET", url, headers, None)
    }

    fn put(&self, url: &str, headers: &[(&str, &str)], body: Vec<u8>) -> Result<HttpResponse, String> {
        self.respond("PUT", url, headers, Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_classification() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn body_snippet_is_truncated() {
        let response = HttpResponse::new(500, "x".repeat(500));
        let snippet = response.body_snippet();
        assert_eq!(snippet.len(), 203);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn mock_replays_in_order_and_records() {
        let client = MockHttpClient::new();
        client.push_response(404, "missing");
        client.push_failure("reset");

        let first = client.get("http://a/1", &[("Accept", "x")]).unwrap();
        assert_eq!(first.status, 404);
        let second = client.put("http://a/2", &[], b"body".to_vec());
        assert_eq!(second, Err("reset".to_string()));
        assert!(client.get("http://a/3", &[]).is_err());

        let requests = client.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].header("accept"), Some("x"));
        assert_eq!(requests[1].method, "PUT");
        assert_eq!(requests[1].body.as_deref(), Some(&b"body"[..]));
    }

    #[test]
    fn arc_clients_share_state() {
        let client = Arc::new(MockHttpClient::new());
        client.push_response(200, "{}");
        let shared: Arc<MockHttpClient> = Arc::clone(&client);

        shared.get("http://a", &[]).unwrap();
        assert_eq!(client.requests().len(), 1);
    }
}
