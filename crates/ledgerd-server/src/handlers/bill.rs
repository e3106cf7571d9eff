//! Classified transactions (`billInfo`)

use serde_json::Value;

use ledgerd_core::schema::BILL_INFO;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, rows_value, str_field, success};
use crate::ServiceContext;

pub struct BillHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BillHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            // Top-level bills only, newest first.
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(db.page(
                    &BILL_INFO,
                    page,
                    size,
                    "\"groupId\" = 0",
                    &[],
                    "\"time\" DESC",
                )))
            }
            "add" => Ok(Value::from(db.insert_bill(&row_body(data)))),
            "update" => {
                let id = int_field(data, "id", 0);
                db.update_bill(&row_body(data), id);
                Ok(success())
            }
            "del" => {
                db.remove(&BILL_INFO, int_field(data, "id", 0));
                Ok(success())
            }
            // Children of one group parent.
            "group" => {
                let group = int_field(data, "groupId", 0);
                Ok(rows_value(db.select_where(
                    &BILL_INFO,
                    "\"groupId\" = ?",
                    &[Value::from(group)],
                )))
            }
            // Day groups for the UI's timeline: `{date, ids}` rows.
            "list/group" => Ok(rows_value(db.bill_day_groups(int_field(data, "limit", 0)))),
            "get" => Ok(rows_value(db.bills_by_ids(str_field(data, "ids")))),
            "sync/list" => Ok(rows_value(db.wait_sync_bills())),
            "sync/status" => {
                let id = int_field(data, "id", 0);
                let sync = int_field(data, "sync", 0);
                db.set_bill_sync(id, sync);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
