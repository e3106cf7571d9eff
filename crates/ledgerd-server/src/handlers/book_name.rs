//! Logical ledgers (`bookName`)

use serde_json::Value;

use ledgerd_core::schema::BOOK_NAME;
use ledgerd_core::Result;

use super::{page_args, row_body, rows_value, success};
use crate::ServiceContext;

pub struct BookNameHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BookNameHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        let db = &self.ctx.db;
        match function {
            "list" => {
                let (page, size) = page_args(data);
                Ok(rows_value(db.page(&BOOK_NAME, page, size, "", &[], "")))
            }
            "add" => {
                db.insert(&BOOK_NAME, &row_body(data));
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"bookName\"", &[], false);
                Ok(success())
            }
            // Full-tree sync: replace every ledger and its categories in one
            // transaction.
            "sync" => {
                let books = data
                    .get("books")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                db.sync_books(&books)?;
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
