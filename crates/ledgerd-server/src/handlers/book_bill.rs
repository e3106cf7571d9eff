//! Reference bills for reconciliation (`bookBill`)

use serde_json::Value;

use ledgerd_core::schema::BOOK_BILL;
use ledgerd_core::{Result, Row};

use super::{int_field, page_args, row_body, rows_value, str_field, success};
use crate::ServiceContext;

pub struct BookBillHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BookBillHandler<'a> {
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
                let book = str_field(data, "book");
                if !book.is_empty() {
                    conditions.push("\"book\" = ?");
                    params.push(Value::from(book));
                }
                if let Some(kind) = data.get("type").and_then(Value::as_i64) {
                    conditions.push("\"type\" = ?");
                    params.push(Value::from(kind));
                }
                let condition = conditions.join(" AND ");
                Ok(rows_value(db.page(
                    &BOOK_BILL, page, size, &condition, &params, "",
                )))
            }
            "add" => {
                db.insert(&BOOK_BILL, &row_body(data));
                Ok(success())
            }
            // Bulk import from the reconciliation source: replaces the whole
            // (book, type) subset atomically.
            "put" => {
                let bills: Vec<Row> = data
                    .get("bills")
                    .and_then(Value::as_array)
                    .map(|list| {
                        list.iter()
                            .filter_map(|v| v.as_object().cloned())
                            .collect()
                    })
                    .unwrap_or_default();
                let book = str_field(data, "book");
                let kind = int_field(data, "type", 0);
                db.import_book_bills(&bills, book, kind)?;
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"bookBill\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
