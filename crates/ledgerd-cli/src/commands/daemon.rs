//! Daemon lifecycle: double-fork, PID file, worker supervision
//!
//! `start` detaches via the classic double fork. Forking MUST happen before
//! any Tokio runtime exists: fork() only duplicates the calling thread, so a
//! forked multi-threaded process inherits locked mutexes it can never
//! unlock. The supervisor therefore stays synchronous; only the spawned
//! worker process (`ledgerd foreground <workspace>`) creates a runtime.
//!
//! Signal dispositions:
//! - SIGTERM: stop the worker, remove the PID file, exit 0
//! - SIGHUP: stop the worker, rotate `daemon.log`, start a fresh worker
//! - worker exit: reaped by the poll loop; restarted unless the exit code
//!   marks a configuration error (unbindable port, missing workspace)

use std::fs::{self, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{dup2, fork, setsid, ForkResult, Pid};

use super::{
    resolve_workspace, EXIT_BIND_ERROR, EXIT_LOG_TOO_LARGE, EXIT_NO_WORKSPACE, EXIT_OK,
    LOG_FILE, MAX_LOG_SIZE, PID_FILE,
};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const RESTART_DELAY: Duration = Duration::from_secs(1);
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

static TERM_REQUESTED: AtomicBool = AtomicBool::new(false);
static HUP_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigterm(_: libc::c_int) {
    TERM_REQUESTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_sighup(_: libc::c_int) {
    HUP_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn start(workspace_arg: Option<PathBuf>) -> i32 {
    let Some(workspace) = resolve_workspace(workspace_arg) else {
        eprintln!("workspace not found");
        return EXIT_NO_WORKSPACE;
    };

    if let Some(pid) = read_pid(&workspace) {
        if process_alive(pid) {
            println!("daemon already running [pid {pid}]");
            return EXIT_OK;
        }
        remove_pid(&workspace);
    }

    let log_path = workspace.join(LOG_FILE);
    if fs::metadata(&log_path).map(|m| m.len() > MAX_LOG_SIZE).unwrap_or(false) {
        eprintln!("{LOG_FILE} exceeds {MAX_LOG_SIZE} bytes, rotate it first");
        return EXIT_LOG_TOO_LARGE;
    }

    if let Err(e) = daemonize(&log_path) {
        eprintln!("daemonize failed: {e}");
        return 3;
    }

    // From here on we are the detached daemon; stdio goes to daemon.log.
    if let Err(e) = fs::write(workspace.join(PID_FILE), std::process::id().to_string()) {
        eprintln!("cannot write PID file: {e}");
        return 3;
    }
    install_signal_handlers();
    println!("supervisor started [pid {}]", std::process::id());
    supervise(&workspace)
}

pub fn stop(workspace_arg: Option<PathBuf>) -> i32 {
    let Some(workspace) = resolve_workspace(workspace_arg) else {
        eprintln!("workspace not found");
        return EXIT_NO_WORKSPACE;
    };
    let Some(pid) = read_pid(&workspace) else {
        println!("daemon not running");
        return EXIT_OK;
    };
    if !process_alive(pid) {
        remove_pid(&workspace);
        println!("daemon not running (stale PID file removed)");
        return EXIT_OK;
    }

    let _ = signal::kill(Pid::from_raw(pid), Signal::SIGTERM);
    let deadline = std::time::Instant::now() + STOP_TIMEOUT;
    while process_alive(pid) {
        if std::time::Instant::now() > deadline {
            eprintln!("daemon [pid {pid}] did not stop");
            return 1;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    println!("daemon stopped");
    EXIT_OK
}

pub fn restart(workspace_arg: Option<PathBuf>) -> i32 {
    let code = stop(workspace_arg.clone());
    if code != EXIT_OK {
        return code;
    }
    start(workspace_arg)
}

pub fn status(workspace_arg: Option<PathBuf>) -> i32 {
    let Some(workspace) = resolve_workspace(workspace_arg) else {
        eprintln!("workspace not found");
        return EXIT_NO_WORKSPACE;
    };
    match read_pid(&workspace) {
        Some(pid) if process_alive(pid) => {
            println!("daemon running [pid {pid}]");
            EXIT_OK
        }
        _ => {
            println!("daemon not running");
            1
        }
    }
}

/// Classic double fork: detach from the controlling terminal and make the
/// grandchild un-reacquirable as a session leader.
fn daemonize(log_path: &Path) -> anyhow::Result<()> {
    // SAFETY: the process is still single-threaded; no runtime, no worker
    // threads, no library threads have been spawned yet.
    match unsafe { fork()? } {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }
    setsid()?;
    match unsafe { fork()? } {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }
    std::env::set_current_dir("/")?;
    redirect_stdio(log_path)?;
    Ok(())
}

fn redirect_stdio(log_path: &Path) -> anyhow::Result<()> {
    let log = OpenOptions::new().create(true).append(true).open(log_path)?;
    let null = OpenOptions::new().read(true).open("/dev/null")?;
    dup2(null.as_raw_fd(), 0)?;
    dup2(log.as_raw_fd(), 1)?;
    dup2(log.as_raw_fd(), 2)?;
    Ok(())
}

fn install_signal_handlers() {
    let term = SigAction::new(
        SigHandler::Handler(on_sigterm),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let hup = SigAction::new(
        SigHandler::Handler(on_sighup),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handlers only touch atomics.
    unsafe {
        let _ = signal::sigaction(Signal::SIGTERM, &term);
        let _ = signal::sigaction(Signal::SIGHUP, &hup);
    }
}

/// Spawn-and-watch loop. SIGCHLD is reaped here through `try_wait`; the
/// short poll keeps signal latency bounded.
fn supervise(workspace: &Path) -> i32 {
    loop {
        let mut child = match spawn_worker(workspace) {
            Ok(child) => child,
            Err(e) => {
                eprintln!("cannot spawn worker: {e}");
                remove_pid(workspace);
                return 3;
            }
        };
        println!("worker started [pid {}]", child.id());

        loop {
            if TERM_REQUESTED.load(Ordering::SeqCst) {
                println!("supervisor stopping on SIGTERM");
                stop_child(&mut child);
                remove_pid(workspace);
                return EXIT_OK;
            }
            if HUP_REQUESTED.swap(false, Ordering::SeqCst) {
                println!("rotating log on SIGHUP");
                stop_child(&mut child);
                rotate_log(workspace);
                break;
            }
            match child.try_wait() {
                Ok(Some(status)) => {
                    let code = status.code().unwrap_or(1);
                    if code == EXIT_BIND_ERROR || code == EXIT_NO_WORKSPACE {
                        eprintln!("worker exited with fatal code {code}, giving up");
                        remove_pid(workspace);
                        return code;
                    }
                    eprintln!("worker exited with code {code}, restarting");
                    std::thread::sleep(RESTART_DELAY);
                    break;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    eprintln!("wait failed: {e}");
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

fn spawn_worker(workspace: &Path) -> std::io::Result<Child> {
    let exe = std::env::current_exe()?;
    // stdio is inherited, so worker output lands in daemon.log too
    Command::new(exe).arg("foreground").arg(workspace).spawn()
}

fn stop_child(child: &mut Child) {
    let pid = Pid::from_raw(child.id() as i32);
    let _ = signal::kill(pid, Signal::SIGTERM);
    let deadline = std::time::Instant::now() + STOP_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if std::time::Instant::now() > deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(_) => return,
        }
    }
}

fn rotate_log(workspace: &Path) {
    let log_path = workspace.join(LOG_FILE);
    let rotated = workspace.join(format!("{LOG_FILE}.1"));
    let _ = fs::rename(&log_path, &rotated);
    // re-point our own stdio at the fresh file
    if let Err(e) = redirect_stdio(&log_path) {
        eprintln!("log rotation failed to reopen: {e}");
    }
}

fn read_pid(workspace: &Path) -> Option<i32> {
    fs::read_to_string(workspace.join(PID_FILE))
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn remove_pid(workspace: &Path) {
    let _ = fs::remove_file(workspace.join(PID_FILE));
}

fn process_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None).is_ok()
}
