//! Service log sink
//!
//! Every materialized line goes to two places: the `log` table (best-effort,
//! a storage failure never raises) and stdout through `tracing`. Lines below
//! ERROR are materialized only when the workspace debug flag is set.

use std::sync::Arc;

use chrono::Local;
use serde_json::Value;

use crate::db::{Database, Row};
use crate::schema::LOG;

/// The `log` table keeps at most this many rows.
pub const LOG_CAP: i64 = 5000;

/// Log severity, ordered `Debug < Info < Warn < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

/// Process-wide log sink.
pub struct ServiceLog {
    db: Arc<Database>,
    debug: bool,
}

impl ServiceLog {
    pub fn new(db: Arc<Database>, debug: bool) -> Self {
        Self { db, debug }
    }

    pub fn debug(&self, msg: &str) {
        self.write(Level::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.write(Level::Info, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.write(Level::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.write(Level::Error, msg);
    }

    fn write(&self, level: Level, msg: &str) {
        if level < Level::Error && !self.debug {
            return;
        }
        let date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        match level {
            Level::Debug => tracing::debug!("{msg}"),
            Level::Info => tracing::info!("{msg}"),
            Level::Warn => tracing::warn!("{msg}"),
            Level::Error => tracing::error!("{msg}"),
        }

        let thread = std::thread::current()
            .name()
            .unwrap_or("worker")
            .to_string();
        let mut row = Row::new();
        row.insert("date".into(), Value::from(date));
        row.insert("app".into(), Value::from("server"));
        row.insert("hook".into(), Value::from(0));
        row.insert("level".into(), Value::from(level as i64));
        row.insert("thread".into(), Value::from(thread));
        row.insert("line".into(), Value::from("server"));
        row.insert("log".into(), Value::from(msg));
        self.append(row);
    }

    /// Insert a pre-built log row and trim the table to [`LOG_CAP`].
    /// Used directly by the `log/add` request path, so it is never gated
    /// by the debug flag.
    pub fn append(&self, row: Row) {
        // Best-effort: insert already collapses failures to 0.
        self.db.insert(&LOG, &row);
        self.db.execute_sql(
            "DELETE FROM \"log\" WHERE \"id\" NOT IN \
             (SELECT \"id\" FROM \"log\" ORDER BY \"id\" DESC LIMIT ?)",
            &[Value::from(LOG_CAP)],
            false,
        );
    }
}
