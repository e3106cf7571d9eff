//! Request handlers
//!
//! One handler per module. Each is a stateless per-request object exposing
//! `handle(function, data) -> Result<Value>`. Conventions shared by all of
//! them:
//!
//! - a successful mutation returns `{"status": 0, "message": "success"}`
//! - a read returns its payload directly (row list, single row, or null)
//! - an unrecognized function is a no-op that returns the success envelope

use serde_json::{json, Map, Value};

use ledgerd_core::Row;

mod assets;
mod assets_map;
mod bill;
mod book_bill;
mod book_name;
mod category;
mod custom;
mod data;
mod js;
mod log;
mod login;
mod rule;
mod setting;

pub use assets::AssetsHandler;
pub use assets_map::AssetsMapHandler;
pub use bill::BillHandler;
pub use book_bill::BookBillHandler;
pub use book_name::BookNameHandler;
pub use category::CategoryHandler;
pub use custom::CustomHandler;
pub use data::DataHandler;
pub use js::JsHandler;
pub use log::LogHandler;
pub use login::LoginHandler;
pub use rule::RuleHandler;
pub use setting::SettingHandler;

/// The cross-cutting mutation reply.
pub(crate) fn success() -> Value {
    json!({"status": 0, "message": "success"})
}

pub(crate) fn str_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

pub(crate) fn int_field(data: &Value, key: &str, default: i64) -> i64 {
    data.get(key).and_then(Value::as_i64).unwrap_or(default)
}

/// `(page, size)` with the list defaults: first page, no limit.
pub(crate) fn page_args(data: &Value) -> (i64, i64) {
    (int_field(data, "page", 1), int_field(data, "size", 0))
}

/// The request body as a row map (empty when the body is not an object).
pub(crate) fn row_body(data: &Value) -> Row {
    data.as_object().cloned().unwrap_or_else(Map::new)
}

/// A single row as a reply value, `null` when absent.
pub(crate) fn row_or_null(rows: Vec<Row>) -> Value {
    rows.into_iter()
        .next()
        .map(Value::Object)
        .unwrap_or(Value::Null)
}

pub(crate) fn rows_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}
