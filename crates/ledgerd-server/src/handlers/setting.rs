//! Per-app key/value settings
//!
//! `(app, key)` uniqueness is a handler-level invariant: `set` looks the
//! pair up first and updates in place when it exists.

use serde_json::Value;

use ledgerd_core::schema::SETTINGS;
use ledgerd_core::{Result, Row};

use super::{int_field, row_or_null, str_field, success};
use crate::ServiceContext;

pub struct SettingHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SettingHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "get" => {
                let app = str_field(data, "app");
                let key = str_field(data, "key");
                Ok(row_or_null(db.select_where(
                    &SETTINGS,
                    "\"app\" = ? AND \"key\" = ?",
                    &[Value::from(app), Value::from(key)],
                )))
            }
            "set" => {
                let app = str_field(data, "app");
                let key = str_field(data, "key");
                let val = str_field(data, "val");

                let mut row = Row::new();
                row.insert("app".into(), Value::from(app));
                row.insert("key".into(), Value::from(key));
                row.insert("val".into(), Value::from(val));

                let existing = db.select_where(
                    &SETTINGS,
                    "\"app\" = ? AND \"key\" = ?",
                    &[Value::from(app), Value::from(key)],
                );
                match existing.first().and_then(|r| r.get("id")).and_then(Value::as_i64) {
                    Some(id) => {
                        db.update(&SETTINGS, &row, id);
                    }
                    None => {
                        db.insert(&SETTINGS, &row);
                    }
                }
                Ok(success())
            }
            "del" => {
                db.remove(&SETTINGS, int_field(data, "id", 0));
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
