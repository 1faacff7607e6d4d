//! Decoded inbound message.

use serde_json::{Map, Value};

/// Name of the wire root element.
pub const ROOT_ELEMENT: &str = "xml";

/// A decoded application message: the children of the `<xml>` root.
///
/// Leaf elements are strings, nested elements are maps and repeated elements
/// are lists. A body parsed upstream may also carry numbers; [`text`] renders
/// scalars uniformly.
///
/// [`text`]: InboundMessage::text
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    fields: Map<String, Value>,
}

impl InboundMessage {
    /// Wrap a structural map, unwrapping the `xml` root if present.
    ///
    /// Returns `None` unless the value (after unwrapping) is a map.
    pub fn from_value(value: Value) -> Option<Self> {
        let value = unwrap_root(value);
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Raw field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Scalar field rendered as text. Maps, lists and nulls yield `None`.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Scalar field, treating an empty string as absent.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.text(name).filter(|s| !s.is_empty())
    }

    /// `MsgType`
    pub fn msg_type(&self) -> Option<String> {
        self.non_empty("MsgType")
    }

    /// `Event`
    pub fn event(&self) -> Option<String> {
        self.non_empty("Event")
    }

    /// `FromUserName`: the user who sent the message.
    pub fn from_user(&self) -> Option<String> {
        self.non_empty("FromUserName")
    }

    /// `ToUserName`: the receiving account.
    pub fn to_user(&self) -> Option<String> {
        self.non_empty("ToUserName")
    }

    /// `CreateTime`
    pub fn create_time(&self) -> Option<String> {
        self.text("CreateTime")
    }

    /// First required field that is missing or empty.
    pub fn missing_required(&self) -> Option<&'static str> {
        ["MsgType", "FromUserName", "ToUserName"]
            .into_iter()
            .find(|name| self.non_empty(name).is_none())
    }

    /// All fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Back to a structural value (without the root wrapper).
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Strip a single `xml` root wrapper.
pub(crate) fn unwrap_root(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get(ROOT_ELEMENT).map_or(false, Value::is_object) => {
            map.remove(ROOT_ELEMENT).unwrap_or(Value::Null)
        }
        other => other,
    }
}
