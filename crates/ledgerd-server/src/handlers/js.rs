//! Script-driven analysis
//!
//! `analyze` is the pipeline that turns a raw captured payload into an
//! enriched bill record: run the bill-extraction script over the payload,
//! match the winning rule, then run the category scripts (user custom
//! script first, stock category script as the fallback) and assemble the
//! final record. Caller-originated requests (`call == 1`) additionally
//! persist the capture, record the bill and poke the foreground UI.
//!
//! `run` evaluates a raw snippet and returns whatever it printed.

use chrono::{Local, Utc};
use serde_json::Value;

use ledgerd_core::schema::{APP_DATA, RULE, SETTINGS};
use ledgerd_core::{Result, Row};

use super::{int_field, str_field, success};
use crate::ServiceContext;

/// Appended after the extraction script: walk the registered rules and
/// print the first extraction whose amount is positive.
const RULE_WALKER: &str = r#"
const data = window.data || '';
const rules = window.rules || [];
for (const rule of rules) {
  let result = null;
  try {
    result = rule.obj.get(data);
    if (result !== null && result.money !== null && parseFloat(result.money) > 0) {
      result.ruleName = rule.name;
      print(JSON.stringify(result));
      break;
    }
  } catch (e) {
    print(e.message);
  }
}
"#;

pub struct JsHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> JsHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        match function {
            "analyze" => self.analyze(data),
            "run" => Ok(Value::from(self.ctx.sandbox.eval(str_field(data, "js")))),
            _ => Ok(success()),
        }
    }

    fn setting(&self, app: &str, key: &str) -> String {
        self.ctx
            .db
            .select_where(
                &SETTINGS,
                "\"app\" = ? AND \"key\" = ?",
                &[Value::from(app), Value::from(key)],
            )
            .into_iter()
            .next()
            .and_then(|row| row.get("val").and_then(Value::as_str).map(String::from))
            .unwrap_or_default()
    }

    fn analyze(&self, data: &Value) -> Result<Value> {
        let raw = str_field(data, "data");
        let app = str_field(data, "app");
        let kind = int_field(data, "type", 0);
        let call = int_field(data, "call", 0);
        let now = Utc::now().timestamp();

        // Captures from other apps are stored no matter what happens next.
        let mut data_id = 0;
        if call == 1 {
            data_id = self.ctx.db.insert(&APP_DATA, &capture_row(raw, app, kind, now));
        }

        let mut extraction = self.setting("server", &format!("{app}{kind}_rule"));
        if extraction.is_empty() {
            extraction = self.setting("server", "rule_js");
        }
        if extraction.is_empty() {
            self.ctx
                .log
                .error("extraction script not found, please rebuild rules");
            return Ok(Value::Object(Row::new()));
        }

        let script = format!(
            "let window = {{}};\nwindow.data = JSON.parse('{raw}');\n{extraction}\n{RULE_WALKER}"
        );
        let printed = self.ctx.sandbox.eval(&script);
        self.ctx.log.info(&format!("extraction result: {printed}"));

        let mut record = match serde_json::from_str::<Value>(&printed) {
            Ok(Value::Object(map)) => map,
            _ => {
                self.ctx
                    .log
                    .error(&format!("extraction did not yield a record: {printed}"));
                return Ok(Value::from("json parse error"));
            }
        };

        let money = record.get("money").and_then(Value::as_f64).unwrap_or(0.0);
        let bill_type = record.get("type").and_then(Value::as_i64).unwrap_or(0);
        let shop_name = sanitized(&record, "shopName");
        let shop_item = sanitized(&record, "shopItem");
        let channel = record
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        // The rule registration is keyed by the channel up to its first dash.
        let rule_name = channel.split('-').next().unwrap_or("").trim().to_string();
        let rule_row = self
            .ctx
            .db
            .select_where(&RULE, "\"name\" = ?", &[Value::from(rule_name)])
            .into_iter()
            .next();

        if call == 1 && data_id > 0 {
            let mut matched = capture_row(raw, app, kind, now);
            matched.insert("match".into(), Value::from(1));
            matched.insert("rule".into(), Value::from(channel.as_str()));
            self.ctx.db.update(&APP_DATA, &matched, data_id);
        }

        let cate_js = self.setting("server", "cate_js");
        if cate_js.is_empty() {
            self.ctx.log.error("category script not found");
            return Ok(Value::Object(Row::new()));
        }
        let custom_js = self.setting("server", "custom_js");
        let time_str = Local::now().format("%H:%M").to_string();

        let category_script = format!(
            "var window = {{money:{money}, type:{bill_type}, shopName:'{shop_name}', \
             shopItem:'{shop_item}', time:'{time_str}'}};\n\
             function getCategory(money,type,shopName,shopItem,time){{ {custom_js} return null}};\n\
             var categoryInfo = getCategory(window.money,window.type,window.shopName,\
             window.shopItem,window.time);\n\
             if(categoryInfo !== null) {{ print(JSON.stringify(categoryInfo)); }} else {{ \
             {cate_js}\n\
             print(JSON.stringify(category.get(window.money, window.type, window.shopName, \
             window.shopItem, window.time))); }}"
        );
        let printed = self.ctx.sandbox.eval(&category_script);
        self.ctx.log.info(&format!("category result: {printed}"));

        let cate = match serde_json::from_str::<Value>(&printed) {
            Ok(v @ Value::Object(_)) => v,
            _ => {
                self.ctx
                    .log
                    .error(&format!("category did not yield a record: {printed}"));
                return Ok(Value::from("json parse error"));
            }
        };

        record.insert(
            "bookName".into(),
            Value::from(str_field(&cate, "book")),
        );
        record.insert(
            "cateName".into(),
            Value::from(str_field(&cate, "category")),
        );
        record.insert("time".into(), Value::from(now));
        record.insert("fromApp".into(), Value::from(app));
        let auto = rule_row
            .as_ref()
            .and_then(|r| r.get("auto_record"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        record.insert("auto".into(), Value::from(auto));

        if call == 1 {
            let bill_id = self.ctx.db.insert_bill(&record);
            if bill_id > 0 {
                self.ctx.notifier.notify(bill_id);
            }
        }
        Ok(Value::Object(record))
    }
}

fn capture_row(raw: &str, app: &str, kind: i64, now: i64) -> Row {
    let mut row = Row::new();
    row.insert("data".into(), Value::from(raw));
    row.insert("source".into(), Value::from(app));
    row.insert("time".into(), Value::from(now));
    row.insert("type".into(), Value::from(kind));
    row.insert("match".into(), Value::from(0));
    row.insert("rule".into(), Value::from(""));
    row.insert("issue".into(), Value::from(0));
    row
}

/// Field as a string with single quotes neutralized, safe to splice into a
/// single-quoted script literal.
fn sanitized(record: &Row, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .replace('\'', "\"")
}
