//! Transport traits and implementations.
//!
//! A [`Transport`] sends one request and hands back whatever the remote
//! side answered. Any received response, whatever its status, is a
//! success at this layer; only failing to get a response is an error.
//! The primary implementation is [`http::UreqTransport`].
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use controlplane::transport::{Method, MockTransport, Request, Response, Transport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.respond(Response::json(201, &json!({"id": "a1", "name": "svc-bot"})));
//!
//! let response = mock.send(&Request::new(Method::Post, "/api/v1/agents")).unwrap();
//! assert_eq!(response.status, 201);
//! assert_eq!(mock.calls().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// HTTP methods used by the Control Plane API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared flag a caller flips to stop calls that have not been sent yet.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every call holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-supplied bounds on a single call.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Point in time after which the call is abandoned.
    pub deadline: Option<Instant>,
    /// Token checked before sending and after the response arrives.
    pub cancel: Option<CancelToken>,
}

impl CallOptions {
    /// No deadline, no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandon the call after `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Abandon the call at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Time left before the deadline, `None` without one.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail with [`Error::Cancelled`] if the call must not proceed.
    pub fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Error::cancelled("cancelled by caller"));
        }
        if self.remaining().is_some_and(|left| left.is_zero()) {
            return Err(Error::cancelled("deadline exceeded"));
        }
        Ok(())
    }
}

/// A request relative to the API base URL.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path starting with `/`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Deadline and cancellation.
    pub options: CallOptions,
}

impl Request {
    /// Create a request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            options: CallOptions::default(),
        }
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach call options.
    pub fn options(mut self, options: &CallOptions) -> Self {
        self.options = options.clone();
        self
    }
}

/// A response of any status.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with a raw body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Create a response carrying a JSON document.
    pub fn json(status: u16, value: &Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));
        response
    }

    /// Create an empty response.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Whether the status is in 200..=299.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to the Control Plane.
///
/// Implementations must treat every received response as `Ok`, whatever
/// its status, and reserve `Err` for calls that produced no response.
pub trait Transport: Send + Sync {
    /// Send one request.
    fn send(&self, request: &Request) -> Result<Response>;
}

/// Mock transport for testing without network access.
///
/// Scripted responses are returned in order; once the script runs out every
/// call gets a `500`. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<Response>>>>,
    calls: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a mock with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn respond(&self, response: Response) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response));
        self
    }

    /// Queue a transport failure.
    pub fn fail(&self, error: Error) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
        self
    }

    /// Every request sent so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(500, "mock script exhausted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_transport_scripted_order() {
        let mock = MockTransport::new();
        mock.respond(Response::empty(204))
            .respond(Response::json(200, &json!({"id": "a1"})));

        let first = mock.send(&Request::new(Method::Delete, "/x")).unwrap();
        let second = mock.send(&Request::new(Method::Get, "/y")).unwrap();
        let third = mock.send(&Request::new(Method::Get, "/z")).unwrap();

        assert_eq!(first.status, 204);
        assert_eq!(second.status, 200);
        assert_eq!(third.status, 500);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[1].path, "/y");
    }

    #[test]
    fn test_mock_transport_failure() {
        let mock = MockTransport::new();
        mock.fail(Error::transport(
            crate::error::TransportKind::Connect,
            "refused",
        ));
        let err = mock.send(&Request::new(Method::Get, "/x")).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_call_options_check() {
        assert!(CallOptions::new().check().is_ok());

        let token = CancelToken::new();
        let opts = CallOptions::new().with_cancel(token.clone());
        assert!(opts.check().is_ok());
        token.cancel();
        assert!(opts.check().unwrap_err().is_cancelled());

        let expired = CallOptions::new().with_deadline(Instant::now());
        assert!(expired.check().unwrap_err().is_cancelled());

        let later = CallOptions::new().with_timeout(Duration::from_secs(30));
        assert!(later.check().is_ok());
        assert!(later.remaining().unwrap() <= Duration::from_secs(30));
    }

    #[test]
    fn test_response_helpers() {
        let ok = Response::json(200, &json!({"a": 1}));
        assert!(ok.is_success());
        assert_eq!(ok.text(), r#"{"a":1}"#);
        assert!(!Response::empty(404).is_success());
        assert!(!Response::empty(199).is_success());
    }
}
