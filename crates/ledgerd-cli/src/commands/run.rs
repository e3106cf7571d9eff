//! The worker process: bring the service up and run the transport server
//!
//! `foreground` is both the user-facing attached mode and the process the
//! supervisor spawns as its worker.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::error;

use ledgerd_core::token::DEFAULT_PUBLISH_ROOT;
use ledgerd_server::{serve, ServiceContext, DEFAULT_PORT};

use super::{
    read_debug_flag, resolve_workspace, EXIT_BIND_ERROR, EXIT_NO_WORKSPACE, EXIT_OK,
    EXIT_TOO_MANY_CONNECTIONS, EXIT_USAGE,
};

pub fn foreground(workspace: Option<PathBuf>) -> i32 {
    let Some(workspace) = resolve_workspace(workspace) else {
        eprintln!("workspace not found");
        return EXIT_NO_WORKSPACE;
    };

    crate::init_tracing();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("cannot create runtime: {e}");
            return EXIT_USAGE;
        }
    };
    runtime.block_on(run_worker(&workspace))
}

async fn run_worker(workspace: &Path) -> i32 {
    let debug = read_debug_flag(workspace);
    let ctx = match ServiceContext::init(
        workspace,
        debug,
        PathBuf::from(DEFAULT_PUBLISH_ROOT),
        None,
    ) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("service init failed: {e}");
            return EXIT_USAGE;
        }
    };
    ctx.log.info(&format!(
        "worker starting [pid {}] version {}",
        std::process::id(),
        ctx.version.current()
    ));

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot install SIGTERM handler: {e}");
            return EXIT_USAGE;
        }
    };

    tokio::select! {
        result = serve(ctx.clone(), DEFAULT_PORT) => match result {
            Ok(()) => EXIT_OK,
            Err(e) => {
                ctx.log.error(&format!("server stopped: {e}"));
                exit_code_for(&e)
            }
        },
        _ = sigterm.recv() => {
            ctx.log.info("worker stopping on SIGTERM");
            EXIT_OK
        }
        _ = tokio::signal::ctrl_c() => {
            ctx.log.info("worker stopping on interrupt");
            EXIT_OK
        }
    }
}

/// Map a transport failure to the documented exit codes: 98 for bind and
/// address errors (fatal, the supervisor gives up), 99 for descriptor
/// exhaustion (restartable).
fn exit_code_for(e: &std::io::Error) -> i32 {
    match e.kind() {
        ErrorKind::AddrInUse | ErrorKind::AddrNotAvailable | ErrorKind::PermissionDenied => {
            EXIT_BIND_ERROR
        }
        _ if matches!(e.raw_os_error(), Some(23) | Some(24)) => EXIT_TOO_MANY_CONNECTIONS,
        _ => EXIT_USAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_errors_are_fatal_code_98() {
        let e = std::io::Error::new(ErrorKind::AddrInUse, "in use");
        assert_eq!(exit_code_for(&e), EXIT_BIND_ERROR);
    }

    #[test]
    fn descriptor_exhaustion_is_code_99() {
        let e = std::io::Error::from_raw_os_error(24);
        assert_eq!(exit_code_for(&e), EXIT_TOO_MANY_CONNECTIONS);
    }
}
