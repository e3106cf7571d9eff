//! Named accounts

use serde_json::Value;

use ledgerd_core::schema::ASSETS;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, row_or_null, rows_value, str_field, success};
use crate::ServiceContext;

pub struct AssetsHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AssetsHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(db.page(&ASSETS, page, size, "", &[], "")))
            }
            "add" => {
                db.insert(&ASSETS, &row_body(data));
                Ok(success())
            }
            "update" => {
                db.update(&ASSETS, &row_body(data), int_field(data, "id", 0));
                Ok(success())
            }
            "del" => {
                db.remove(&ASSETS, int_field(data, "id", 0));
                Ok(success())
            }
            "get" => {
                let name = str_field(data, "name");
                Ok(row_or_null(db.select_where(
                    &ASSETS,
                    "\"name\" = ?",
                    &[Value::from(name)],
                )))
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"assets\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
