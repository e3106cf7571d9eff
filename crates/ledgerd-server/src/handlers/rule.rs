//! Enabled-rule registrations
//!
//! `name` is unique by convention, not by schema; `get` returns the first
//! match.

use serde_json::Value;

use ledgerd_core::schema::RULE;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, row_or_null, rows_value, str_field, success};
use crate::ServiceContext;

pub struct RuleHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RuleHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(db.page(&RULE, page, size, "", &[], "")))
            }
            "get" => {
                let name = str_field(data, "name");
                Ok(row_or_null(db.select_where(
                    &RULE,
                    "\"name\" = ?",
                    &[Value::from(name)],
                )))
            }
            "add" => {
                db.insert(&RULE, &row_body(data));
                Ok(success())
            }
            "update" => {
                db.update(&RULE, &row_body(data), int_field(data, "id", 0));
                Ok(success())
            }
            "del" => {
                db.remove(&RULE, int_field(data, "id", 0));
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"rule\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
