//! Command implementations
//!
//! - `reconcile`: plan, apply, destroy, refresh
//! - `tracked`: show, state, import
//! - `remote`: list, get, job

pub mod reconcile;
pub mod remote;
pub mod tracked;

use crate::Context;
use crate::cli::ProviderArgs;
use crate::engine::Session;
use crate::paths;
use crate::state::State;
use anyhow::{Context as AnyhowContext, Result};
use controlplane::settings::{ENV_API_KEY, ENV_BASE_URL, ENV_ENVIRONMENT, ENV_LOG_FILE, ENV_ORG_ID};
use controlplane::{CallOptions, Client, Settings};

/// Resolve Control Plane settings from flags (which clap already merged
/// with the environment)
pub fn settings(provider: &ProviderArgs) -> Result<Settings> {
    let mut settings = Settings::from_lookup(|name| match name {
        ENV_API_KEY => provider.api_key.clone(),
        ENV_ORG_ID => provider.org_id.clone(),
        ENV_BASE_URL => provider.base_url.clone(),
        ENV_ENVIRONMENT => provider.environment.clone(),
        ENV_LOG_FILE => provider.log_file.clone(),
        _ => None,
    })
    .context("Missing Control Plane credentials (see --api-key and --org-id)")?;
    settings.log_file = paths::expand(&settings.log_file.to_string_lossy());
    log::debug!("Using {settings:?}");
    Ok(settings)
}

/// Client for the configured Control Plane
pub fn client(ctx: &Context) -> Result<Client> {
    Ok(Client::new(&settings(&ctx.provider)?))
}

/// Client plus tracked state
pub fn session(ctx: &Context) -> Result<Session> {
    let client = client(ctx)?;
    let state_path = paths::state_file()?;
    let state = State::load(&state_path)?;
    Ok(Session::new(client, state, state_path).with_options(call_options(ctx)))
}

/// Per-run call options: a deadline when `--timeout` is given
pub fn call_options(ctx: &Context) -> CallOptions {
    match ctx.timeout {
        Some(timeout) => CallOptions::new().with_timeout(timeout),
        None => CallOptions::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_flags() {
        let provider = ProviderArgs {
            api_key: Some("sk-test".to_string()),
            org_id: Some("org-1".to_string()),
            base_url: Some("http://localhost:8000/".to_string()),
            environment: None,
            log_file: Some("/tmp/kcp-test.log".to_string()),
        };
        let settings = settings(&provider).unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.base_url, "http://localhost:8000");
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.log_file.to_string_lossy(), "/tmp/kcp-test.log");
    }

    #[test]
    fn test_missing_credentials() {
        let provider = ProviderArgs {
            org_id: Some("org-1".to_string()),
            ..Default::default()
        };
        let err = settings(&provider).unwrap_err();
        assert!(format!("{err:#}").contains("KUBIYA_CONTROL_PLANE_API_KEY"));
    }
}
