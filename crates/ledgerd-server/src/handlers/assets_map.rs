//! Account-name normalization rules

use serde_json::Value;

use ledgerd_core::schema::ASSETS_MAP;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, rows_value, success};
use crate::ServiceContext;

pub struct AssetsMapHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AssetsMapHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(db.page(&ASSETS_MAP, page, size, "", &[], "")))
            }
            "add" => {
                db.insert(&ASSETS_MAP, &row_body(data));
                Ok(success())
            }
            "update" => {
                db.update(&ASSETS_MAP, &row_body(data), int_field(data, "id", 0));
                Ok(success())
            }
            "del" => {
                db.remove(&ASSETS_MAP, int_field(data, "id", 0));
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"assetsMap\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
