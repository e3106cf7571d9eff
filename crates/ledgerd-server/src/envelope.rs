//! The wire envelope
//!
//! Every frame on the transport is one JSON object `{id, type, data}`.
//! `type` is a `module/function` pair; the reply echoes `id` and `type`
//! unchanged and carries the handler's result in `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
        }
    }

    /// Split `type` into `(module, function)` at the first `/`.
    /// `bill/sync/list` yields `("bill", "sync/list")`.
    pub fn split_kind(&self) -> Option<(&str, &str)> {
        self.kind.split_once('/')
    }

    /// Serialize for the wire. An envelope never fails to serialize, but a
    /// defect here must not kill the connection loop, so fall back to a
    /// bare object.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
