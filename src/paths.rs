//! Path resolution for kcp
//!
//! # Environment Variables
//!
//! - `KCP_STATE_DIR` - Override the state directory
//! - `KCP_MANIFEST` - Default manifest when `--file` is not given
//!
//! # Path Resolution Priority
//!
//! For state_dir():
//! 1. `KCP_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/kcp` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\kcp`
//!    - macOS/Linux: `~/.local/state/kcp`
//!
//! For manifest_path():
//! 1. `--file` flag
//! 2. `KCP_MANIFEST` environment variable
//! 3. `./kcp.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "KCP_STATE_DIR";

/// Environment variable for the default manifest
pub const ENV_MANIFEST: &str = "KCP_MANIFEST";

/// Manifest used when nothing else is configured
pub const DEFAULT_MANIFEST: &str = "kcp.toml";

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.json";

/// Get the kcp state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("kcp");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join("kcp");
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("kcp");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Path of the state file
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(STATE_FILE))
}

/// Resolve the manifest path
pub fn manifest_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return expand(&path.to_string_lossy());
    }
    if let Ok(path) = std::env::var(ENV_MANIFEST) {
        log::debug!("Using manifest from {}: {}", ENV_MANIFEST, path);
        return expand(&path);
    }
    PathBuf::from(DEFAULT_MANIFEST)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
