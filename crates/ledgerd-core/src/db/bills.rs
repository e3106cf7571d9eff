//! Bill-specific storage operations
//!
//! These sit on top of the generic CRUD because bills carry retention and
//! integrity rules the schema can't express:
//!
//! - rows already synced upstream (`syncFromApp = 1`) are capped at the
//!   1000 most recent by `time`; older ones are purged on every write
//! - a child bill (`groupId != 0`) must point at an existing top-level
//!   parent; dangling children are deleted opportunistically
//!
//! The reference-bill import and the full-tree book sync replace whole
//! table subsets, so they run inside explicit transactions and roll back
//! on any failure.

use serde_json::Value;
use tracing::error;

use super::{insert_row, Database, Row};
use crate::error::Result;
use crate::schema::{BILL_INFO, BOOK_BILL, BOOK_NAME, CATEGORY};

/// How many already-synced bills are retained locally.
const SYNCED_BILL_CAP: i64 = 1000;

impl Database {
    /// Insert a bill and re-establish the retention and parent invariants.
    /// Returns the new id, or `0` on failure.
    pub fn insert_bill(&self, row: &Row) -> i64 {
        let id = self.insert(&BILL_INFO, row);
        if id > 0 {
            self.prune_bills();
        }
        id
    }

    /// Update a bill in place, then re-establish the invariants (an update
    /// can detach children by re-grouping or re-dating their parent).
    pub fn update_bill(&self, row: &Row, id: i64) -> bool {
        let ok = self.update(&BILL_INFO, row, id);
        if ok {
            self.prune_bills();
        }
        ok
    }

    fn prune_bills(&self) {
        self.execute_sql(
            "DELETE FROM \"billInfo\" WHERE \"syncFromApp\" = 1 AND \"id\" NOT IN \
             (SELECT \"id\" FROM \"billInfo\" WHERE \"syncFromApp\" = 1 \
              ORDER BY \"time\" DESC LIMIT ?)",
            &[Value::from(SYNCED_BILL_CAP)],
            false,
        );
        self.execute_sql(
            "DELETE FROM \"billInfo\" WHERE \"groupId\" != 0 AND \"groupId\" NOT IN \
             (SELECT \"id\" FROM \"billInfo\" WHERE \"groupId\" = 0)",
            &[],
            false,
        );
    }

    /// Top-level bills still pending upstream sync.
    pub fn wait_sync_bills(&self) -> Vec<Row> {
        self.select_where(
            &BILL_INFO,
            "\"syncFromApp\" = 0 AND \"groupId\" = 0",
            &[],
        )
    }

    /// Flip the sync flag of one bill.
    pub fn set_bill_sync(&self, id: i64, sync: i64) -> bool {
        self.execute_sql(
            "UPDATE \"billInfo\" SET \"syncFromApp\" = ? WHERE \"id\" = ?",
            &[Value::from(sync), Value::from(id)],
            false,
        );
        true
    }

    /// Top-level bills grouped by calendar day, newest day first. Each row
    /// is `{date, ids}` where `ids` is a comma-joined id list; resolve the
    /// ids through [`Database::bills_by_ids`].
    pub fn bill_day_groups(&self, limit: i64) -> Vec<Row> {
        let mut sql = String::from(
            "SELECT strftime('%Y-%m-%d', \"time\", 'unixepoch') AS date, \
             group_concat(\"id\") AS ids FROM \"billInfo\" \
             WHERE \"groupId\" = 0 GROUP BY date ORDER BY date DESC",
        );
        let mut params: Vec<Value> = Vec::new();
        if limit > 0 {
            sql.push_str(" LIMIT ?");
            params.push(Value::from(limit));
        }
        self.execute_sql(&sql, &params, true)
    }

    /// Fetch bills by a comma-separated id list (non-numeric entries are
    /// skipped).
    pub fn bills_by_ids(&self, ids: &str) -> Vec<Row> {
        let parsed: Vec<Value> = ids
            .split(',')
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .map(Value::from)
            .collect();
        if parsed.is_empty() {
            return Vec::new();
        }
        let placeholders: Vec<&str> = parsed.iter().map(|_| "?").collect();
        let condition = format!("\"id\" IN ({})", placeholders.join(", "));
        self.select_where(&BILL_INFO, &condition, &parsed)
    }

    /// Replace the reference bills of one `(book, type)` subset with the
    /// supplied rows, atomically.
    pub fn import_book_bills(&self, bills: &[Row], book: &str, kind: i64) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM \"bookBill\" WHERE \"book\" = ? AND \"type\" = ?",
            rusqlite::params![book, kind],
        )?;
        for bill in bills {
            let mut row = bill.clone();
            row.insert("book".into(), Value::from(book));
            row.insert("type".into(), Value::from(kind));
            insert_row(&tx, &BOOK_BILL, &row)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Full-tree ledger sync: truncate `bookName` and `category` together
    /// and repopulate both from `{name, icon, categories: [...]}` entries,
    /// atomically.
    pub fn sync_books(&self, books: &[Value]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM \"bookName\"", [])?;
        tx.execute("DELETE FROM \"category\"", [])?;
        for book in books {
            let Some(obj) = book.as_object() else {
                continue;
            };
            let book_id = insert_row(&tx, &BOOK_NAME, obj)?;
            if let Some(categories) = obj.get("categories").and_then(Value::as_array) {
                for category in categories {
                    let Some(cat) = category.as_object() else {
                        continue;
                    };
                    let mut row = cat.clone();
                    row.insert("book".into(), Value::from(book_id));
                    insert_row(&tx, &CATEGORY, &row)?;
                }
            }
        }
        if let Err(e) = tx.commit() {
            error!("book sync commit failed: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}
