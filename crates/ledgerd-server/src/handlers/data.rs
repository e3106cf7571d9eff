//! Raw captured payloads (`appData`)

use serde_json::Value;

use ledgerd_core::schema::APP_DATA;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, rows_value, str_field, success};
use crate::ServiceContext;

/// Only this many captures are kept; older ones are trimmed on every add.
const APP_DATA_CAP: i64 = 500;

pub struct DataHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> DataHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "list" => {
                let (page, size) = page_args(data);
                let mut conditions: Vec<&str> = Vec::new();
                let mut params: Vec<Value> = Vec::new();

                if let Some(flag) = data.get("match").and_then(Value::as_i64) {
                    conditions.push("\"match\" = ?");
                    params.push(Value::from(flag));
                }
                let needle = str_field(data, "data");
                if !needle.is_empty() {
                    conditions.push("\"data\" LIKE ?");
                    params.push(Value::from(format!("%{needle}%")));
                }

                let condition = conditions.join(" AND ");
                Ok(rows_value(db.page(
                    &APP_DATA, page, size, &condition, &params, "",
                )))
            }
            "add" => {
                db.insert(&APP_DATA, &row_body(data));
                db.execute_sql(
                    "DELETE FROM \"appData\" WHERE \"id\" NOT IN \
                     (SELECT \"id\" FROM \"appData\" ORDER BY \"id\" DESC LIMIT ?)",
                    &[Value::from(APP_DATA_CAP)],
                    false,
                );
                Ok(success())
            }
            "update" => {
                let id = int_field(data, "id", 0);
                db.update(&APP_DATA, &row_body(data), id);
                Ok(success())
            }
            "del" => {
                db.remove(&APP_DATA, int_field(data, "id", 0));
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"appData\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
