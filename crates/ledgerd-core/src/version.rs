//! Installed-version tracking
//!
//! The workspace carries a `version.txt` written by the installer. The
//! string read at startup is memoized; [`VersionManager::check`] re-reads
//! the file so a swapped installation is detected while the service is
//! still running.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

const VERSION_FILE: &str = "version.txt";
const DEFAULT_VERSION: &str = "1.0.0";

pub struct VersionManager {
    path: PathBuf,
    current: String,
}

impl VersionManager {
    /// Read (or create with the default) the workspace version file.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = workspace.join(VERSION_FILE);
        let current = match fs::read_to_string(&path) {
            Ok(s) => s.trim().to_string(),
            Err(_) => {
                fs::write(&path, DEFAULT_VERSION)?;
                DEFAULT_VERSION.to_string()
            }
        };
        Ok(Self { path, current })
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// True while the on-disk version still matches the one seen at start.
    pub fn check(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|s| s.trim() == self.current)
            .unwrap_or(false)
    }
}
