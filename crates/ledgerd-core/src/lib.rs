//! ledgerd core library
//!
//! Shared functionality for the ledgerd auto-bookkeeping daemon:
//! - SQLite storage engine with schema-driven generic CRUD and paging
//! - Declarative schema registry for the twelve persisted entities
//! - Per-companion-app token lifecycle and publication
//! - Installed-version tracking
//! - Service log sink (log table + stdout)
//! - Sandboxed ECMAScript evaluation for rule/category scripts
//! - Foreground-UI notification seam

pub mod db;
pub mod error;
pub mod logger;
pub mod notify;
pub mod schema;
pub mod script;
pub mod token;
pub mod version;

pub use db::{Database, Row};
pub use error::{Error, Result};
pub use logger::{Level, ServiceLog};
pub use notify::{IntentNotifier, Notifier, RecordingNotifier};
pub use script::Sandbox;
pub use token::{TokenManager, DEFAULT_PUBLISH_ROOT, TOKEN_LEN};
pub use version::VersionManager;
