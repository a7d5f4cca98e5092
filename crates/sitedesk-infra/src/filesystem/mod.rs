//! Filesystem adapters for SiteDesk.
//!
//! Data directory layout:
//!
//! ```text
//! {data_dir}/
//!   config.toml    console configuration
//!   session.json   client store snapshot (credential + theme)
//! ```

pub mod session;

use std::path::{Path, PathBuf};

pub use session::FileClientBackend;

/// Path of the client store snapshot.
pub fn session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SITEDESK_DATA_DIR` environment variable
/// 2. `~/.sitedesk`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SITEDESK_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".sitedesk");
    }

    // Last resort: current directory
    PathBuf::from(".sitedesk")
}
