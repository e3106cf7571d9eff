//! Route registry
//!
//! The module set is closed, so routing is a pattern match over an enum
//! rather than a string-keyed factory table: parsing the module name is the
//! registry lookup, and the match arm constructs a fresh handler object for
//! the request. Adding a module means adding a variant, which the compiler
//! then walks through every match.

use serde_json::Value;

use ledgerd_core::Result;

use crate::handlers;
use crate::ServiceContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Login,
    Data,
    Log,
    Bill,
    Assets,
    AssetsMap,
    BookName,
    Setting,
    Category,
    Custom,
    Rule,
    BookBill,
    Js,
}

impl Module {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "login" => Some(Self::Login),
            "data" => Some(Self::Data),
            "log" => Some(Self::Log),
            "bill" => Some(Self::Bill),
            "assets" => Some(Self::Assets),
            "assets_map" => Some(Self::AssetsMap),
            "book_name" => Some(Self::BookName),
            "setting" => Some(Self::Setting),
            "category" => Some(Self::Category),
            "custom" => Some(Self::Custom),
            "rule" => Some(Self::Rule),
            "book_bill" => Some(Self::BookBill),
            "js" => Some(Self::Js),
            _ => None,
        }
    }
}

/// Build a per-request handler for `module` and run `function` against it.
pub fn dispatch(
    ctx: &ServiceContext,
    module: Module,
    function: &str,
    data: &Value,
) -> Result<Value> {
    match module {
        Module::Login => handlers::LoginHandler::new(ctx).handle(function, data),
        Module::Data => handlers::DataHandler::new(ctx).handle(function, data),
        Module::Log => handlers::LogHandler::new(ctx).handle(function, data),
        Module::Bill => handlers::BillHandler::new(ctx).handle(function, data),
        Module::Assets => handlers::AssetsHandler::new(ctx).handle(function, data),
        Module::AssetsMap => handlers::AssetsMapHandler::new(ctx).handle(function, data),
        Module::BookName => handlers::BookNameHandler::new(ctx).handle(function, data),
        Module::Setting => handlers::SettingHandler::new(ctx).handle(function, data),
        Module::Category => handlers::CategoryHandler::new(ctx).handle(function, data),
        Module::Custom => handlers::CustomHandler::new(ctx).handle(function, data),
        Module::Rule => handlers::RuleHandler::new(ctx).handle(function, data),
        Module::BookBill => handlers::BookBillHandler::new(ctx).handle(function, data),
        Module::Js => handlers::JsHandler::new(ctx).handle(function, data),
    }
}
