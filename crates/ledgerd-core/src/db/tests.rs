//! Storage engine tests

use serde_json::{json, Value};

use super::*;
use crate::schema::{APP_DATA, ASSETS, BILL_INFO, BOOK_BILL, BOOK_NAME, CATEGORY, SETTINGS};

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object literal")
}

fn bill(time: i64, sync: i64, group: i64) -> Row {
    row(json!({
        "type": 0,
        "currency": "CNY",
        "money": 9.9,
        "fee": 0.0,
        "time": time,
        "shopName": "shop",
        "shopItem": "item",
        "cateName": "cate",
        "extendData": "",
        "bookName": "default",
        "accountNameFrom": "",
        "accountNameTo": "",
        "fromApp": "test",
        "groupId": group,
        "channel": "test-channel",
        "syncFromApp": sync,
        "remark": "",
        "auto": 0
    }))
}

#[test]
fn tables_created_on_open() {
    let db = Database::in_memory().unwrap();
    let tables = db.execute_sql(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        &[],
        true,
    );
    let names: Vec<&str> = tables
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str))
        .collect();
    for expected in [
        "appData", "assets", "assetsMap", "auth", "billInfo", "bookBill", "bookName", "category",
        "customRule", "log", "rule", "settings",
    ] {
        assert!(names.contains(&expected), "missing table {expected}");
    }
}

#[test]
fn insert_select_update_remove_round_trip() {
    let db = Database::in_memory().unwrap();

    let id = db.insert(
        &ASSETS,
        &row(json!({"name": "Wallet", "icon": "i", "sort": 1, "type": 0, "extras": ""})),
    );
    assert!(id > 0);

    let fetched = db.select_by_id(&ASSETS, id);
    assert_eq!(fetched["name"], "Wallet");
    assert_eq!(fetched["id"], json!(id));

    let ok = db.update(
        &ASSETS,
        &row(json!({"name": "Card", "icon": "i", "sort": 2, "type": 0, "extras": "x"})),
        id,
    );
    assert!(ok);
    assert_eq!(db.select_by_id(&ASSETS, id)["name"], "Card");

    assert!(db.remove(&ASSETS, id));
    assert!(db.select_by_id(&ASSETS, id).is_empty());
    assert!(!db.remove(&ASSETS, id));
}

#[test]
fn ids_monotonically_increase_and_are_not_reused() {
    let db = Database::in_memory().unwrap();
    let a = db.insert(&BOOK_NAME, &row(json!({"name": "a", "icon": ""})));
    let b = db.insert(&BOOK_NAME, &row(json!({"name": "b", "icon": ""})));
    assert!(b > a);
    db.remove(&BOOK_NAME, b);
    let c = db.insert(&BOOK_NAME, &row(json!({"name": "c", "icon": ""})));
    assert!(c > b, "autoincrement must not reuse {b}");
}

#[test]
fn missing_fields_bind_null() {
    let db = Database::in_memory().unwrap();
    let id = db.insert(&SETTINGS, &row(json!({"app": "server", "key": "k"})));
    let fetched = db.select_by_id(&SETTINGS, id);
    assert_eq!(fetched["val"], Value::Null);
}

#[test]
fn page_is_one_based_with_descending_default_order() {
    let db = Database::in_memory().unwrap();
    for i in 0..25 {
        db.insert(
            &APP_DATA,
            &row(json!({
                "data": format!("payload-{i}"),
                "source": "app",
                "time": i,
                "match": 0,
                "rule": "",
                "issue": 0,
                "type": 0
            })),
        );
    }

    let first = db.page(&APP_DATA, 1, 10, "", &[], "");
    assert_eq!(first.len(), 10);
    assert_eq!(first[0]["data"], "payload-24");

    let third = db.page(&APP_DATA, 3, 10, "", &[], "");
    assert_eq!(third.len(), 5);
    assert_eq!(third[4]["data"], "payload-0");

    // size <= 0 means no limit clause
    let all = db.page(&APP_DATA, 1, 0, "", &[], "");
    assert_eq!(all.len(), 25);

    // explicit order override
    let ascending = db.page(&APP_DATA, 1, 5, "", &[], "\"time\" ASC");
    assert_eq!(ascending[0]["data"], "payload-0");
}

#[test]
fn page_condition_binds_parameters() {
    let db = Database::in_memory().unwrap();
    for i in 0..6 {
        db.insert(
            &APP_DATA,
            &row(json!({
                "data": format!("d{i}"),
                "source": "app",
                "time": i,
                "match": i % 2,
                "rule": "",
                "issue": 0,
                "type": 0
            })),
        );
    }
    let matched = db.page(&APP_DATA, 1, 0, "\"match\" = ?", &[json!(1)], "");
    assert_eq!(matched.len(), 3);
    assert!(matched.iter().all(|r| r["match"] == json!(1)));
}

#[test]
fn execute_sql_readonly_decodes_by_storage_class() {
    let db = Database::in_memory().unwrap();
    db.insert(
        &ASSETS,
        &row(json!({"name": "n", "icon": "", "sort": 7, "type": 0, "extras": ""})),
    );
    let rows = db.execute_sql(
        "SELECT \"name\", \"sort\", 1.5 AS ratio FROM \"assets\"",
        &[],
        true,
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "n");
    assert_eq!(rows[0]["sort"], json!(7));
    assert_eq!(rows[0]["ratio"], json!(1.5));
}

#[test]
fn execute_sql_failure_is_neutral() {
    let db = Database::in_memory().unwrap();
    assert!(db.execute_sql("SELECT * FROM no_such_table", &[], true).is_empty());
    // a failed write must not panic either
    db.execute_sql("UPDATE no_such_table SET x = 1", &[], false);
}

#[test]
fn synced_bills_capped_at_most_recent_1000() {
    let db = Database::in_memory().unwrap();
    for i in 0..1001 {
        let id = db.insert_bill(&bill(1_700_000_000 + i, 1, 0));
        assert!(id > 0);
    }
    let remaining = db.select_where(&BILL_INFO, "\"syncFromApp\" = 1", &[]);
    assert_eq!(remaining.len(), 1000);

    let oldest = remaining
        .iter()
        .filter_map(|r| r["time"].as_i64())
        .min()
        .unwrap();
    // the very first insert is the one purged
    assert_eq!(oldest, 1_700_000_001);
}

#[test]
fn unsynced_bills_are_never_purged() {
    let db = Database::in_memory().unwrap();
    for i in 0..1005 {
        db.insert_bill(&bill(i, 0, 0));
    }
    let all = db.select_where(&BILL_INFO, "", &[]);
    assert_eq!(all.len(), 1005);
}

#[test]
fn dangling_children_removed_on_next_write() {
    let db = Database::in_memory().unwrap();
    let parent = db.insert_bill(&bill(100, 0, 0));
    let child = db.insert_bill(&bill(101, 0, parent));
    assert!(!db.select_by_id(&BILL_INFO, child).is_empty());

    db.remove(&BILL_INFO, parent);
    // still present until the next bill write re-establishes the invariant
    assert!(!db.select_by_id(&BILL_INFO, child).is_empty());

    db.insert_bill(&bill(102, 0, 0));
    assert!(db.select_by_id(&BILL_INFO, child).is_empty());
}

#[test]
fn wait_sync_lists_unsynced_top_level_only() {
    let db = Database::in_memory().unwrap();
    let parent = db.insert_bill(&bill(1, 0, 0));
    db.insert_bill(&bill(2, 0, parent)); // child, excluded
    db.insert_bill(&bill(3, 1, 0)); // synced, excluded

    let pending = db.wait_sync_bills();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], json!(parent));

    assert!(db.set_bill_sync(parent, 1));
    assert!(db.wait_sync_bills().is_empty());
}

#[test]
fn bill_day_groups_bucket_by_calendar_day() {
    let db = Database::in_memory().unwrap();
    // two bills on 2024-01-01, one on 2024-01-02, plus a child to exclude
    let day1 = 1_704_067_200; // 2024-01-01 00:00:00 UTC
    let day2 = day1 + 86_400;
    let a = db.insert_bill(&bill(day1 + 10, 0, 0));
    let b = db.insert_bill(&bill(day1 + 20, 0, 0));
    let c = db.insert_bill(&bill(day2 + 30, 0, 0));
    db.insert_bill(&bill(day2 + 40, 0, c));

    let groups = db.bill_day_groups(0);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["date"], "2024-01-02");
    assert_eq!(groups[0]["ids"], json!(c.to_string()));
    assert_eq!(groups[1]["date"], "2024-01-01");
    let ids = groups[1]["ids"].as_str().unwrap();
    let mut listed: Vec<i64> = ids.split(',').map(|s| s.parse().unwrap()).collect();
    listed.sort_unstable();
    assert_eq!(listed, vec![a, b]);

    assert_eq!(db.bill_day_groups(1).len(), 1);
}

#[test]
fn bills_by_ids_parses_comma_list() {
    let db = Database::in_memory().unwrap();
    let a = db.insert_bill(&bill(1, 0, 0));
    let b = db.insert_bill(&bill(2, 0, 0));
    db.insert_bill(&bill(3, 0, 0));

    let found = db.bills_by_ids(&format!("{a}, {b}, junk"));
    assert_eq!(found.len(), 2);
    assert!(db.bills_by_ids("").is_empty());
}

#[test]
fn book_bill_import_replaces_subset_atomically() {
    let db = Database::in_memory().unwrap();
    let stale = row(json!({
        "amount": 1.0, "time": 1, "remark": "", "billId": "old",
        "type": 0, "book": "B", "category": "c",
        "accountFrom": "", "accountTo": ""
    }));
    db.insert(&BOOK_BILL, &stale);
    // a row of a different (book, type) subset survives the import
    let mut other = stale.clone();
    other.insert("book".into(), json!("other"));
    other.insert("billId".into(), json!("keep"));
    db.insert(&BOOK_BILL, &other);

    let incoming: Vec<Row> = (0..3)
        .map(|i| {
            row(json!({
                "amount": 10.0 + i as f64, "time": i, "remark": "",
                "billId": format!("bx-{i}"), "category": "c",
                "accountFrom": "", "accountTo": ""
            }))
        })
        .collect();
    db.import_book_bills(&incoming, "B", 0).unwrap();

    let in_book = db.select_where(&BOOK_BILL, "\"book\" = ?", &[json!("B")]);
    assert_eq!(in_book.len(), 3);
    assert!(in_book.iter().all(|r| r["billId"] != "old"));

    let kept = db.select_where(&BOOK_BILL, "\"book\" = ?", &[json!("other")]);
    assert_eq!(kept.len(), 1);
}

#[test]
fn book_sync_truncates_and_repopulates_together() {
    let db = Database::in_memory().unwrap();
    db.insert(&BOOK_NAME, &row(json!({"name": "stale", "icon": ""})));
    db.insert(
        &CATEGORY,
        &row(json!({
            "name": "stale-cat", "icon": "", "remoteId": "",
            "parent": 0, "book": 1, "sort": 0, "type": 0
        })),
    );

    let books = vec![json!({
        "name": "Daily",
        "icon": "book.png",
        "categories": [
            {"name": "Food", "icon": "", "remoteId": "r1", "parent": 0, "sort": 0, "type": 0},
            {"name": "Transport", "icon": "", "remoteId": "r2", "parent": 0, "sort": 1, "type": 0}
        ]
    })];
    db.sync_books(&books).unwrap();

    let book_rows = db.select_where(&BOOK_NAME, "", &[]);
    assert_eq!(book_rows.len(), 1);
    assert_eq!(book_rows[0]["name"], "Daily");
    let book_id = book_rows[0]["id"].as_i64().unwrap();

    let cats = db.select_where(&CATEGORY, "", &[]);
    assert_eq!(cats.len(), 2);
    assert!(cats.iter().all(|c| c["book"] == json!(book_id)));
}

#[test]
fn settings_read_back_declared_types() {
    let db = Database::in_memory().unwrap();
    let id = db.insert(
        &SETTINGS,
        &row(json!({"app": "server", "key": "debug", "val": "1"})),
    );
    let fetched = db.select_by_id(&SETTINGS, id);
    // val is declared TEXT, so the numeric-looking string stays a string
    assert_eq!(fetched["val"], "1");
}
