//! Envelope codec. Decodes a UTF-8 text frame into a tagged [`InboundEnvelope`] without
//! yet validating type-specific fields — that is the router's job, since a missing `topic` is a
//! recoverable per-envelope error while a missing `type` is a hard decode failure.

use serde_json::{Map, Value};

use crate::error::CodecError;

/// A decoded envelope: its `type` tag plus the rest of the JSON object's fields.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    pub kind: String,
    fields: Map<String, Value>,
}

impl InboundEnvelope {
    pub fn decode(frame: &str) -> Result<Self, CodecError> {
        let value: Value =
            serde_json::from_str(frame).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
        let mut fields = match value {
            Value::Object(map) => map,
            _ => return Err(CodecError::NotAnObject),
        };
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Err(CodecError::MissingType),
        };
        Ok(Self { kind, fields })
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)?.as_str()
    }

    /// A string field that is either absent or present-but-empty is treated the same way by the
    /// `subscribe`/`publish` topic checks.
    pub fn non_empty_str_field(&self, name: &str) -> Option<&str> {
        self.str_field(name).filter(|s| !s.is_empty())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}
