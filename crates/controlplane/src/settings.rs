//! Provider settings.
//!
//! Resolved from environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `KUBIYA_CONTROL_PLANE_API_KEY` | required |
//! | `KUBIYA_CONTROL_PLANE_ORG_ID` | required |
//! | `KUBIYA_CONTROL_PLANE_ENV` | `development` |
//! | `KUBIYA_CONTROL_PLANE_BASE_URL` | `https://control-plane.kubiya.ai` |
//! | `KUBIYA_API_LOG_FILE` | `/tmp/kubiya_api_errors.log` |

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "KUBIYA_CONTROL_PLANE_API_KEY";
/// Environment variable holding the organization id.
pub const ENV_ORG_ID: &str = "KUBIYA_CONTROL_PLANE_ORG_ID";
/// Environment variable holding the environment label.
pub const ENV_ENVIRONMENT: &str = "KUBIYA_CONTROL_PLANE_ENV";
/// Environment variable overriding the API base URL.
pub const ENV_BASE_URL: &str = "KUBIYA_CONTROL_PLANE_BASE_URL";
/// Environment variable overriding the diagnostic log path.
pub const ENV_LOG_FILE: &str = "KUBIYA_API_LOG_FILE";

/// Production API base URL.
pub const DEFAULT_BASE_URL: &str = "https://control-plane.kubiya.ai";
/// Diagnostic log used when none is configured.
pub const DEFAULT_LOG_FILE: &str = "/tmp/kubiya_api_errors.log";
/// Environment label used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "development";
/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything needed to talk to one Control Plane.
#[derive(Clone)]
pub struct Settings {
    /// Bearer token.
    pub api_key: String,
    /// Organization the key belongs to.
    pub org_id: String,
    /// Environment label, e.g. `production`.
    pub environment: String,
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Where failed requests are recorded.
    pub log_file: PathBuf,
    /// Upper bound for one request.
    pub timeout: Duration,
}

impl Settings {
    /// Create settings with defaults for everything but the credentials.
    pub fn new(api_key: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            org_id: org_id.into(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings through `lookup`, which maps a variable name to
    /// its value. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY)
            .ok_or_else(|| Error::Config(format!("{ENV_API_KEY} is not set")))?;
        let org_id =
            get(ENV_ORG_ID).ok_or_else(|| Error::Config(format!("{ENV_ORG_ID} is not set")))?;

        let mut settings = Self::new(api_key, org_id);
        if let Some(environment) = get(ENV_ENVIRONMENT) {
            settings.environment = environment;
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            settings = settings.with_base_url(&base_url);
        }
        if let Some(log_file) = get(ENV_LOG_FILE) {
            settings.log_file = PathBuf::from(log_file);
        }
        Ok(settings)
    }

    /// Replace the base URL, trimming trailing slashes.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Full URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &crate::redact::REDACTED)
            .field("org_id", &self.org_id)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("log_file", &self.log_file)
            .field("timeout", &self.timeout)
            .finish()
    }
}
