//! HTTP transport on ureq.
//!
//! Every request carries `Authorization: Bearer <key>` and a JSON content
//! type. Non-2xx statuses come back as ordinary responses; only failing to
//! get a response is an error. Both cases append a redacted record to the
//! diagnostic sink.

use super::{Method, Request, Response, Transport};
use crate::diagnostics::{DiagnosticSink, FailedRequest, FileSink, Outcome};
use crate::error::{Error, Result};
use crate::redact;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::{Duration, Instant};

type RawResponse = ureq::http::Response<ureq::Body>;

/// Transport sending requests over HTTPS.
///
/// # Example
///
/// ```no_run
/// use controlplane::Settings;
/// use controlplane::transport::http::UreqTransport;
/// use controlplane::transport::{Method, Request, Transport};
///
/// let settings = Settings::new("sk-...", "org-1");
/// let transport = UreqTransport::new(&settings);
/// let response = transport.send(&Request::new(Method::Get, "/api/v1/agents")).unwrap();
/// println!("{}", response.status);
/// ```
pub struct UreqTransport {
    agent: ureq::Agent,
    settings: Settings,
    sink: Arc<dyn DiagnosticSink>,
}

impl UreqTransport {
    /// Create a transport recording failures in the configured log file.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let sink = Arc::new(FileSink::new(settings.log_file.clone()));
        Self::with_sink(settings, sink)
    }

    /// Create a transport recording failures in `sink`.
    #[must_use]
    pub fn with_sink(settings: &Settings, sink: Arc<dyn DiagnosticSink>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            settings: settings.clone(),
            sink,
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.settings.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
    }

    /// Per-request timeout: the configured one, shortened to the deadline.
    fn timeout_for(&self, request: &Request) -> Duration {
        match request.options.remaining() {
            Some(left) => left.min(self.settings.timeout),
            None => self.settings.timeout,
        }
    }

    fn prepare<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.config().timeout_global(Some(timeout)).build()
    }

    fn dispatch(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<&str>,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, ureq::Error> {
        match method {
            Method::Get => self.prepare(self.agent.get(url), headers, timeout).call(),
            Method::Delete => self.prepare(self.agent.delete(url), headers, timeout).call(),
            Method::Post | Method::Put | Method::Patch => {
                let builder = match method {
                    Method::Put => self.agent.put(url),
                    Method::Patch => self.agent.patch(url),
                    _ => self.agent.post(url),
                };
                let builder = self.prepare(builder, headers, timeout);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        }
    }

    fn record(&self, failed: &FailedRequest<'_>) {
        self.sink.append(&failed.render());
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = self.settings.url(&request.path);
        let headers = self.headers();
        let body = request.body.as_ref().map(ToString::to_string);
        let timeout = self.timeout_for(request);

        let start = Instant::now();
        let result = self.dispatch(request.method, &url, &headers, body.as_deref(), timeout);
        let duration = start.elapsed();

        let mut raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                let message = err.to_string();
                self.record(&FailedRequest {
                    method: request.method.as_str(),
                    url: &url,
                    headers: &headers,
                    body: body.as_deref(),
                    duration,
                    outcome: Outcome::Failed {
                        message: message.clone(),
                    },
                });
                log::error!(
                    "{} {} failed after {}ms: {} (details in {})",
                    request.method,
                    redact::redact_url(&url),
                    duration.as_millis(),
                    redact::redact_text(&message),
                    self.sink.location()
                );
                let deadline_hit = request
                    .options
                    .remaining()
                    .is_some_and(|left| left.is_zero());
                if matches!(err, ureq::Error::Timeout(_)) && deadline_hit {
                    return Err(Error::cancelled("deadline exceeded"));
                }
                return Err(err.into());
            }
        };

        let status = raw.status().as_u16();
        let response_headers: Vec<(String, String)> = raw
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let response_body = raw.body_mut().read_to_vec()?;

        log::debug!(
            "{} {} -> {} in {}ms",
            request.method,
            redact::redact_url(&url),
            status,
            duration.as_millis()
        );

        let response = Response {
            status,
            headers: response_headers,
            body: response_body,
        };
        if !response.is_success() {
            self.record(&FailedRequest {
                method: request.method.as_str(),
                url: &url,
                headers: &headers,
                body: body.as_deref(),
                duration,
                outcome: Outcome::Status {
                    status,
                    headers: &response.headers,
                    body: &response.body,
                },
            });
            log::error!(
                "{} {} returned status {} (details in {})",
                request.method,
                redact::redact_url(&url),
                status,
                self.sink.location()
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned response and hand back the raw request text.
    fn serve_once(status_line: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let reply = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    length = value.trim().parse().unwrap();
                }
                head.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            head.push_str(&String::from_utf8_lossy(&body));
            reader.get_mut().write_all(reply.as_bytes()).unwrap();
            head
        });
        (base, handle)
    }

    fn transport(base: &str, sink: Arc<MemorySink>) -> UreqTransport {
        let settings = Settings::new("sk-live-123", "org-1").with_base_url(base);
        UreqTransport::with_sink(&settings, sink)
    }

    #[test]
    fn test_sends_bearer_and_json_headers() {
        let (base, server) = serve_once("201 Created", r#"{"id":"a1","status":"idle"}"#);
        let sink = Arc::new(MemorySink::new());
        let transport = transport(&base, sink.clone());

        let request = Request::new(Method::Post, "/api/v1/agents").body(json!({"name": "svc-bot"}));
        let response = transport.send(&request).unwrap();

        assert_eq!(response.status, 201);
        let raw = server.join().unwrap();
        assert!(raw.starts_with("POST /api/v1/agents"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-live-123"));
        assert!(raw.contains(r#"{"name":"svc-bot"}"#));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_error_status_is_recorded_redacted() {
        let (base, server) = serve_once(
            "422 Unprocessable Entity",
            r#"{"detail":"invalid","api_key":"sk-abcdef"}"#,
        );
        let sink = Arc::new(MemorySink::new());
        let transport = transport(&base, sink.clone());

        let request = Request::new(Method::Post, "/api/v1/agents")
            .body(json!({"name": "svc-bot", "api_key": "sk-abcdef"}));
        let response = transport.send(&request).unwrap();
        server.join().unwrap();

        assert_eq!(response.status, 422);
        assert!(response.text().contains("sk-abcdef"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("Status Code: 422"));
        assert!(records[0].contains("[REDACTED]"));
        assert!(!records[0].contains("sk-abcdef"));
        assert!(!records[0].contains("sk-live-123"));
    }

    #[test]
    fn test_connection_failure_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let sink = Arc::new(MemorySink::new());
        let transport = transport(&base, sink.clone());
        let err = transport
            .send(&Request::new(Method::Get, "/api/v1/agents/a1"))
            .unwrap_err();

        assert_eq!(err.category(), crate::ErrorCategory::Transport);
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("Error: "));
    }

    #[test]
    fn test_deadline_passing_mid_flight_is_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(2));
            drop(stream);
        });

        let sink = Arc::new(MemorySink::new());
        let transport = transport(&base, sink.clone());
        let request = Request::new(Method::Get, "/api/v1/agents/a1")
            .options(&crate::CallOptions::new().with_timeout(Duration::from_millis(300)));
        let err = transport.send(&request).unwrap_err();

        assert!(err.is_cancelled());
        assert!(!err.is_not_found());
        assert_eq!(err.category(), crate::ErrorCategory::Transport);
        assert_eq!(sink.records().len(), 1);
        server.join().unwrap();
    }

    #[test]
    fn test_unwritable_log_does_not_hide_error_status() {
        let (base, server) = serve_once("422 Unprocessable Entity", r#"{"detail":"invalid"}"#);
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings::new("sk-live-123", "org-1").with_base_url(&base);
        let sink = Arc::new(FileSink::new(dir.path().join("missing").join("errors.log")));
        let transport = UreqTransport::with_sink(&settings, sink);

        let response = transport
            .send(&Request::new(Method::Post, "/api/v1/agents").body(json!({"name": "x"})))
            .unwrap();
        server.join().unwrap();

        assert_eq!(response.status, 422);
        assert!(response.text().contains("invalid"));
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_timeout_is_clamped_to_deadline() {
        let settings = Settings::new("k", "o");
        let transport = UreqTransport::with_sink(&settings, Arc::new(MemorySink::new()));

        let open = Request::new(Method::Get, "/x");
        assert_eq!(transport.timeout_for(&open), Duration::from_secs(60));

        let bounded = Request::new(Method::Get, "/x")
            .options(&crate::CallOptions::new().with_timeout(Duration::from_secs(5)));
        assert!(transport.timeout_for(&bounded) <= Duration::from_secs(5));
    }
}
