// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request envelope and argument accessors.
//
// The method channel delivers `{caller, arguments: {clientIndex?, channelId?,
// args?, ...}}`. The envelope pulls out the routing fields without judging
// them; `Args` then reads method arguments and turns every missing or
// mistyped field into a decode error naming that field.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use rtm_core::error::Result;
use rtm_core::{BridgeError, ClientIndex};

/// Routing fields of one inbound call.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub caller: Option<String>,
    /// `None` when absent, negative, non-integer, or out of range.
    pub client_index: Option<ClientIndex>,
    pub channel_id: Option<String>,
    /// The inner `arguments` object. Static methods read their fields here.
    pub params: Map<String, Value>,
    /// `arguments.args`. Instance methods read their fields here.
    pub args: Map<String, Value>,
}

impl Envelope {
    pub fn from_call(arguments: &Value) -> Self {
        let caller = arguments
            .get("caller")
            .and_then(Value::as_str)
            .map(str::to_string);
        let params = arguments
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let client_index = params
            .get("clientIndex")
            .and_then(Value::as_u64)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(ClientIndex);
        let channel_id = params
            .get("channelId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let args = params
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self {
            caller,
            client_index,
            channel_id,
            params,
            args,
        }
    }
}

/// Typed view over one method's argument map.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    method: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Args<'a> {
    pub fn new(method: &'static str, map: &'a Map<String, Value>) -> Self {
        Self { method, map }
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    fn err(&self, field: &str, reason: impl ToString) -> BridgeError {
        BridgeError::decode(self.method, field, reason)
    }

    /// The raw value of `field`, treating JSON `null` as absent.
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    pub fn str(&self, field: &str) -> Result<String> {
        self.opt_str(field)?.ok_or_else(|| self.err(field, "missing"))
    }

    pub fn opt_str(&self, field: &str) -> Result<Option<String>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.err(field, "expected a string")),
        }
    }

    pub fn int(&self, field: &str) -> Result<i64> {
        match self.present(field) {
            None => Err(self.err(field, "missing")),
            Some(v) => v.as_i64().ok_or_else(|| self.err(field, "expected an integer")),
        }
    }

    pub fn str_list(&self, field: &str) -> Result<Vec<String>> {
        let items = self
            .present(field)
            .ok_or_else(|| self.err(field, "missing"))?
            .as_array()
            .ok_or_else(|| self.err(field, "expected an array of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.err(field, "expected an array of strings"))
            })
            .collect()
    }

    pub fn value<T: DeserializeOwned>(&self, field: &str) -> Result<T> {
        self.opt_value(field)?.ok_or_else(|| self.err(field, "missing"))
    }

    pub fn opt_value<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        self.present(field)
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| self.err(field, e)))
            .transpose()
    }

    /// Convert an integer field through a fallible domain conversion.
    pub fn int_as<T>(&self, field: &str) -> Result<T>
    where
        T: TryFrom<i64>,
        T::Error: std::fmt::Display,
    {
        let raw = self.int(field)?;
        T::try_from(raw).map_err(|e| self.err(field, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtm_core::LogFilter;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn envelope_extracts_routing_fields() {
        let env = Envelope::from_call(&json!({
            "caller": "AgoraRtmChannel",
            "arguments": { "clientIndex": 3, "channelId": "lobby", "args": { "x": 1 } }
        }));
        assert_eq!(env.caller.as_deref(), Some("AgoraRtmChannel"));
        assert_eq!(env.client_index, Some(ClientIndex(3)));
        assert_eq!(env.channel_id.as_deref(), Some("lobby"));
        assert_eq!(env.args.get("x"), Some(&json!(1)));
    }

    #[test]
    fn mistyped_client_index_is_absent() {
        for bad in [json!("0"), json!(-1), json!(1.5), json!(null)] {
            let env = Envelope::from_call(&json!({
                "caller": "AgoraRtmClient",
                "arguments": { "clientIndex": bad }
            }));
            assert_eq!(env.client_index, None);
        }
    }

    #[test]
    fn missing_arguments_object_is_tolerated() {
        let env = Envelope::from_call(&json!({ "caller": "AgoraRtmClient#static" }));
        assert!(env.params.is_empty());
        assert!(env.args.is_empty());
        let env = Envelope::from_call(&Value::Null);
        assert_eq!(env.caller, None);
    }

    #[test]
    fn missing_and_mistyped_fields_name_the_field() {
        let m = map(json!({ "userId": 7, "token": null }));
        let args = Args::new("login", &m);

        let err = args.str("userId").expect_err("wrong type");
        assert!(err.to_string().contains("`userId`"));
        assert!(err.to_string().contains("expected a string"));

        let err = args.str("peerId").expect_err("missing");
        assert!(err.to_string().contains("`peerId`"));

        assert_eq!(args.opt_str("token").expect("null is absent"), None);
    }

    #[test]
    fn string_lists_reject_mixed_items() {
        let m = map(json!({ "peerIds": ["a", 2] }));
        assert!(Args::new("queryPeersOnlineStatus", &m).str_list("peerIds").is_err());
    }

    #[test]
    fn int_as_reports_domain_errors() {
        let m = map(json!({ "filter": 3, "size": 1024 }));
        let args = Args::new("setLogFilter", &m);
        assert!(args.int_as::<LogFilter>("filter").is_err());
        assert_eq!(args.int_as::<u32>("size").expect("u32"), 1024);
    }
}
