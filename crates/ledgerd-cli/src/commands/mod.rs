//! Command implementations and shared process plumbing

use std::path::{Path, PathBuf};

pub mod daemon;
pub mod run;

/// Exit codes of the service binary.
pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 1;
pub const EXIT_NO_WORKSPACE: i32 = 2;
pub const EXIT_LOG_TOO_LARGE: i32 = 97;
pub const EXIT_BIND_ERROR: i32 = 98;
pub const EXIT_TOO_MANY_CONNECTIONS: i32 = 99;

/// Probed in order when no workspace argument is given.
pub const WORKSPACE_CANDIDATES: &[&str] = &[
    "/data/local/tmp/ledgerd",
    "/data/data/net.ankio.auto/files/ledgerd",
    ".",
];

pub const PID_FILE: &str = "daemon.pid";
pub const LOG_FILE: &str = "daemon.log";

/// `daemon.log` beyond this size refuses to start; rotate via SIGHUP.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Resolve the workspace: the explicit argument if given, else the first
/// existing candidate directory.
pub fn resolve_workspace(arg: Option<PathBuf>) -> Option<PathBuf> {
    let path = match arg {
        Some(path) => path,
        None => WORKSPACE_CANDIDATES
            .iter()
            .copied()
            .map(PathBuf::from)
            .find(|p| p.is_dir())?,
    };
    if !path.is_dir() {
        return None;
    }
    // The daemon chdirs away, so everything downstream needs an absolute path.
    path.canonicalize().ok()
}

/// The workspace `debug.txt` flag: `true`/`1` materializes sub-ERROR logs.
pub fn read_debug_flag(workspace: &Path) -> bool {
    std::fs::read_to_string(workspace.join("debug.txt"))
        .map(|s| matches!(s.trim(), "true" | "1"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_workspace_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_workspace(Some(dir.path().to_path_buf())).is_some());
        assert!(resolve_workspace(Some(dir.path().join("missing"))).is_none());
    }

    #[test]
    fn resolved_workspace_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_workspace(Some(dir.path().to_path_buf())).unwrap();
        assert!(resolved.is_absolute());
    }

    #[test]
    fn debug_flag_accepts_true_and_one() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!read_debug_flag(dir.path()));

        fs::write(dir.path().join("debug.txt"), "true\n").unwrap();
        assert!(read_debug_flag(dir.path()));

        fs::write(dir.path().join("debug.txt"), "1").unwrap();
        assert!(read_debug_flag(dir.path()));

        fs::write(dir.path().join("debug.txt"), "yes").unwrap();
        assert!(!read_debug_flag(dir.path()));
    }
}
