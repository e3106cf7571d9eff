//! Client-submitted log lines

use serde_json::Value;

use ledgerd_core::schema::LOG;
use ledgerd_core::Result;

use super::{page_args, row_body, rows_value, success};
use crate::ServiceContext;

pub struct LogHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LogHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        match function {
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(self.ctx.db.page(&LOG, page, size, "", &[], "")))
            }
            "add" => {
                self.ctx.log.append(row_body(data));
                Ok(success())
            }
            "clear" => {
                self.ctx.db.execute_sql("DELETE FROM \"log\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
