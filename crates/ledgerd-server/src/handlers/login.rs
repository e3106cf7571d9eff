//! Companion-app login
//!
//! Status codes: 0 = authenticated, 1 = token mismatch (the stored token is
//! republished as a side effect), 2 = the on-disk installation changed since
//! the service started.

use serde_json::{json, Value};

use ledgerd_core::Result;

use super::{str_field, success};
use crate::ServiceContext;

pub struct LoginHandler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LoginHandler<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub fn handle(&self, function: &str, data: &Value) -> Result<Value> {
        match function {
            "login" => {
                let app = str_field(data, "app");
                let token = str_field(data, "token");
                if !self.ctx.tokens.verify(app, token) {
                    self.ctx.log.warn(&format!("login rejected for {app}"));
                    return Ok(json!({"status": 1, "msg": "token mismatch"}));
                }
                if !self.ctx.version.check() {
                    self.ctx
                        .log
                        .warn("login rejected: installed version changed");
                    return Ok(json!({"status": 2, "msg": "version changed"}));
                }
                Ok(json!({"status": 0, "msg": "success"}))
            }
            _ => Ok(success()),
        }
    }
}
