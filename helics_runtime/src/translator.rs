//! The Core's translator federate (§4.7): bridges typed value interfaces
//! and raw message endpoints.

use helics_core::{GlobalFederateId, InterfaceHandle};
use helics_message::ActionMessage;

/// The encoding a [`TranslatorInfo`] uses to bridge a value and a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorType {
    Json,
    Binary,
    Custom,
}

/// A tagged value, mirroring Design Notes' "dynamic typing on values"
/// tagged union: the set a translator can encode to/from a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Int64(i64),
    Complex(f64, f64),
    Vector(Vec<f64>),
    String(String),
    NamedPoint(String, f64),
    Bool(bool),
    Raw(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    /// Encodes this value into the payload a JSON-type translator puts on
    /// the wire: `{"value": ..., "type": "..."}`.
    pub fn to_json_payload(&self) -> Vec<u8> {
        let (value, type_name) = match self {
            Value::Double(d) => (serde_json::json!(d), "double"),
            Value::Int64(i) => (serde_json::json!(i), "int64"),
            Value::Complex(re, im) => (serde_json::json!([re, im]), "complex"),
            Value::Vector(v) => (serde_json::json!(v), "vector"),
            Value::String(s) => (serde_json::json!(s), "string"),
            Value::NamedPoint(name, val) => (serde_json::json!({"name": name, "value": val}), "named_point"),
            Value::Bool(b) => (serde_json::json!(b), "bool"),
            Value::Raw(bytes) => (serde_json::json!(bytes), "raw"),
            Value::Json(v) => (v.clone(), "json"),
        };
        serde_json::json!({"value": value, "type": type_name}).to_string().into_bytes()
    }

    /// Decodes a payload produced by [`Value::to_json_payload`]. Unknown
    /// or malformed payloads strict-mode-reject rather than guess a type.
    pub fn from_json_payload(bytes: &[u8], strict: bool) -> Option<Value> {
        let parsed: serde_json::Value = serde_json::from_slice(bytes).ok()?;
        let type_name = parsed.get("type")?.as_str()?;
        let value = parsed.get("value")?;
        match type_name {
            "double" => value.as_f64().map(Value::Double),
            "int64" => value.as_i64().map(Value::Int64),
            "complex" => {
                let arr = value.as_array()?;
                Some(Value::Complex(arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
            }
            "vector" => {
                let arr = value.as_array()?;
                Some(Value::Vector(arr.iter().filter_map(|v| v.as_f64()).collect()))
            }
            "string" => value.as_str().map(|s| Value::String(s.to_string())),
            "named_point" => Some(Value::NamedPoint(
                value.get("name")?.as_str()?.to_string(),
                value.get("value")?.as_f64()?,
            )),
            "bool" => value.as_bool().map(Value::Bool),
            "raw" => {
                let arr = value.as_array()?;
                Some(Value::Raw(arr.iter().filter_map(|v| v.as_u64().map(|b| b as u8)).collect()))
            }
            "json" => Some(Value::Json(value.clone())),
            _ if strict => None,
            // Non-strict mode narrows best-effort rather than rejecting.
            _ => value.as_f64().map(Value::Double),
        }
    }
}

/// One registered translator: the endpoints it bridges to/from, and its
/// wire encoding.
pub struct TranslatorInfo {
    pub core_id: GlobalFederateId,
    pub handle: InterfaceHandle,
    pub key: String,
    pub source_endpoints: Vec<InterfaceHandle>,
    pub dest_endpoints: Vec<InterfaceHandle>,
    pub input_targets: Vec<InterfaceHandle>,
    pub publication_targets: Vec<InterfaceHandle>,
    pub kind: TranslatorType,
    pub strict: bool,
}

impl TranslatorInfo {
    /// A publication update arriving at this translator: emit a message to
    /// every destination endpoint carrying the encoded value.
    pub fn encode_for_endpoints(&self, value: &Value, source: helics_core::GlobalHandle) -> Vec<ActionMessage> {
        let payload = match self.kind {
            TranslatorType::Json => value.to_json_payload(),
            TranslatorType::Binary | TranslatorType::Custom => value.to_json_payload(),
        };
        self.dest_endpoints
            .iter()
            .map(|&handle| {
                let mut msg = ActionMessage::new(helics_message::ActionCode::SendMessage);
                msg.source = source;
                msg.dest = helics_core::GlobalHandle::new(self.core_id, handle);
                msg.payload = payload.clone();
                msg
            })
            .collect()
    }

    /// A message arriving at a source endpoint: decode to a value for
    /// every input target. Round trip (publish -> message -> back through
    /// a second translator -> input) must reproduce the original value.
    pub fn decode_from_message(&self, msg: &ActionMessage) -> Option<Value> {
        match self.kind {
            TranslatorType::Json | TranslatorType::Binary | TranslatorType::Custom => {
                Value::from_json_payload(&msg.payload, self.strict)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips_a_double() {
        let v = Value::Double(27.0);
        let payload = v.to_json_payload();
        let back = Value::from_json_payload(&payload, true).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn json_round_trips_a_vector() {
        let v = Value::Vector(vec![1.0, 2.0, 3.0]);
        let payload = v.to_json_payload();
        assert_eq!(Value::from_json_payload(&payload, true).unwrap(), v);
    }

    #[test]
    fn json_round_trips_an_arbitrary_json_value() {
        let v = Value::Json(serde_json::json!({"a": 1, "b": [true, null, "x"]}));
        let payload = v.to_json_payload();
        assert_eq!(Value::from_json_payload(&payload, true).unwrap(), v);
    }

    #[test]
    fn strict_mode_rejects_an_unknown_type_tag() {
        let bytes = serde_json::json!({"value": 1, "type": "mystery"}).to_string().into_bytes();
        assert!(Value::from_json_payload(&bytes, true).is_none());
    }

    #[test]
    fn publish_then_message_produces_one_message_per_destination() {
        let info = TranslatorInfo {
            core_id: GlobalFederateId::new(1),
            handle: InterfaceHandle::from(0usize),
            key: "t".into(),
            source_endpoints: vec![],
            dest_endpoints: vec![InterfaceHandle::from(1usize), InterfaceHandle::from(2usize)],
            input_targets: vec![],
            publication_targets: vec![],
            kind: TranslatorType::Json,
            strict: true,
        };
        let source = helics_core::GlobalHandle::new(GlobalFederateId::new(1), InterfaceHandle::from(0usize));
        let msgs = info.encode_for_endpoints(&Value::Double(27.0), source);
        assert_eq!(msgs.len(), 2);
    }
}
