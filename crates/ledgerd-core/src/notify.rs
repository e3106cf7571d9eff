//! Foreground-UI notification seam
//!
//! After an auto-recorded bill lands in storage, the UI app is poked with a
//! one-shot, fire-and-forget signal carrying the new bill id. Production
//! shells out to the Android activity manager; tests swap in a recorder.

use std::process::Command;
use std::sync::{Arc, Mutex};

use crate::logger::ServiceLog;

pub trait Notifier: Send + Sync {
    /// Tell the foreground UI that bill `id` is ready for confirmation.
    /// Must not fail loudly: delivery problems are logged, never returned.
    fn notify(&self, id: i64);
}

/// Launches the confirmation surface through `am start`.
pub struct IntentNotifier {
    log: Arc<ServiceLog>,
}

impl IntentNotifier {
    pub fn new(log: Arc<ServiceLog>) -> Self {
        Self { log }
    }
}

impl Notifier for IntentNotifier {
    fn notify(&self, id: i64) {
        let cmd = format!(
            "am start -a \"net.ankio.auto.ACTION_SHOW_FLOATING_WINDOW\" \
             -d \"autoaccounting://bill?id={id}\" \
             --ez \"android.intent.extra.NO_ANIMATION\" true -f 0x10000000"
        );
        self.log.info(&format!("launching UI: {cmd}"));
        match Command::new("sh").arg("-c").arg(&cmd).status() {
            Ok(status) if status.success() => {}
            Ok(status) => self.log.error(&format!("am start exited with {status}")),
            Err(e) => self.log.error(&format!("am start failed: {e}")),
        }
    }
}

/// Records notified ids instead of launching anything.
pub struct RecordingNotifier {
    seen: Mutex<Vec<i64>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<i64> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, id: i64) {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).push(id);
    }
}
