//! Hierarchical categories

use serde_json::Value;

use ledgerd_core::schema::CATEGORY;
use ledgerd_core::Result;

use super::{int_field, page_args, row_body, row_or_null, rows_value, str_field, success};
use crate::ServiceContext;

pub struct CategoryHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CategoryHandler<'a> {
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
                for key in ["book", "type", "parent"] {
                    if let Some(v) = data.get(key).and_then(Value::as_i64) {
                        conditions.push(match key {
                            "book" => "\"book\" = ?",
                            "type" => "\"type\" = ?",
                            _ => "\"parent\" = ?",
                        });
                        params.push(Value::from(v));
                    }
                }
                let condition = conditions.join(" AND ");
                Ok(rows_value(db.page(
                    &CATEGORY,
                    page,
                    size,
                    &condition,
                    &params,
                    "\"sort\" ASC",
                )))
            }
            "add" => {
                db.insert(&CATEGORY, &row_body(data));
                Ok(success())
            }
            "get" => {
                let name = str_field(data, "name");
                let book = int_field(data, "book", 0);
                let kind = int_field(data, "type", 0);
                Ok(row_or_null(db.select_where(
                    &CATEGORY,
                    "\"name\" = ? AND \"book\" = ? AND \"type\" = ?",
                    &[Value::from(name), Value::from(book), Value::from(kind)],
                )))
            }
            "del" => {
                db.remove(&CATEGORY, int_field(data, "id", 0));
                Ok(success())
            }
            "clear" => {
                db.execute_sql("DELETE FROM \"category\"", &[], false);
                Ok(success())
            }
            _ => Ok(success()),
        }
    }
}
