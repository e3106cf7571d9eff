//! User-defined classification rules (`customRule`)

use serde_json::Value;

use ledgerd_core::schema::CUSTOM_RULE;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, rows_value, success};
use crate::ServiceContext;

pub struct CustomHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CustomHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(db.page(
                    &CUSTOM_RULE,
                    page,
                    size,
                    "",
                    &[],
                    "\"sort\" ASC",
                )))
            }
            "add" => {
                db.insert(&CUSTOM_RULE, &row_body(data));
                Ok(success())
            }
            "update" => {
                db.update(&CUSTOM_RULE, &row_body(data), int_field(data, "id", 0));
                Ok(success())
            }
            "del" => {
                db.remove(&CUSTOM_RULE, int_field(data, "id", 0));
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"customRule\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
