//! Out-of-band diagnostic records for failed requests.
//!
//! When a request fails (non-2xx or no response at all) the transport
//! appends a human-readable block to a [`DiagnosticSink`]. Everything in
//! the block passes through [`crate::redact`] first. The error value
//! returned to the caller is never redacted and never carries the block.
//!
//! Sinks are shared between concurrent reconciliations. Each record is
//! written with a single call, so blocks never interleave; no ordering
//! between records is promised.

use crate::redact;
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Append-only destination for diagnostic records.
///
/// `append` never fails: a sink that cannot write logs a warning and
/// drops the record, so the original request error is never masked.
pub trait DiagnosticSink: Send + Sync {
    /// Append one complete record.
    fn append(&self, record: &str);

    /// Where records end up, for log messages.
    fn location(&self) -> String;
}

/// Sink appending to a file, created on first write.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    /// Create a sink for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path records are appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for FileSink {
    fn append(&self, record: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(record.as_bytes()));
        if let Err(e) = result {
            log::warn!(
                "Could not write diagnostic record to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory sink, for tests and for callers that collect records.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far.
    #[must_use]
    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn append(&self, record: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.to_string());
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// How a failed request ended.
#[derive(Debug, Clone)]
pub enum Outcome<'a> {
    /// The server answered with a non-2xx status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: &'a [(String, String)],
        /// Raw response body.
        body: &'a [u8],
    },
    /// No response was received.
    Failed {
        /// Transport error message.
        message: String,
    },
}

/// A failed request about to be recorded.
#[derive(Debug, Clone)]
pub struct FailedRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Full request URL.
    pub url: &'a str,
    /// Request headers as sent.
    pub headers: &'a [(String, String)],
    /// Serialized request body.
    pub body: Option<&'a str>,
    /// Time between send and response or failure.
    pub duration: Duration,
    /// What happened.
    pub outcome: Outcome<'a>,
}

impl FailedRequest<'_> {
    /// Render the redacted diagnostic block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("\n========== API ERROR ==========\n");
        out.push_str(&format!(
            "Time: {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        out.push_str(&format!("Method: {}\n", self.method));
        out.push_str(&format!("URL: {}\n", redact::redact_url(self.url)));
        match &self.outcome {
            Outcome::Status { status, .. } => out.push_str(&format!("Status Code: {status}\n")),
            Outcome::Failed { message } => out.push_str(&format!(
                "Error: {}\n",
                redact::redact_text(message)
            )),
        }
        out.push_str(&format!("Duration: {}ms\n", self.duration.as_millis()));

        out.push_str("\n--- Request Headers ---\n");
        for (name, value) in redact::redact_headers(self.headers) {
            out.push_str(&format!("{name}: {value}\n"));
        }
        if let Some(body) = self.body.filter(|b| !b.is_empty()) {
            out.push_str(&format!(
                "\n--- Request Body ---\n{}\n",
                redact::redact_text(body)
            ));
        }

        if let Outcome::Status { headers, body, .. } = &self.outcome {
            out.push_str("\n--- Response Headers ---\n");
            for (name, value) in redact::redact_headers(headers) {
                out.push_str(&format!("{name}: {value}\n"));
            }
            out.push_str(&format!(
                "\n--- Response Body ---\n{}\n",
                redact::redact_text(&String::from_utf8_lossy(body))
            ));
        }
        out.push_str("===============================\n\n");
        out
    }
}
