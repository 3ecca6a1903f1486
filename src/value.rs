//! Loggable values.
//!
//! Arguments and response bodies are handed to the log sink as a [`LogValue`].
//! Primitives are wrapped in a one-field tagged object (`{"StringValue": ..}`,
//! `{"NumberValue": ..}`, ...) so structured renderers print them as values
//! rather than trying to destructure them; anything else is passed through
//! as raw JSON.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Number, Value};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Text(String),
    Number(Number),
    Bool(bool),
    Id(Uuid),
    Opaque(Value),
}

impl LogValue {
    /// Dispatch a JSON value onto the matching variant.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Number(n) => Self::Number(n),
            Value::Bool(b) => Self::Bool(b),
            other => Self::Opaque(other),
        }
    }

    /// Serialize `value` and dispatch the result.
    ///
    /// Values that fail to serialize are recorded as text describing the
    /// failure; logging never fails a request.
    pub fn capture<T: serde::Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Self::from_json(json),
            Err(e) => Self::Text(format!("<unserializable: {e}>")),
        }
    }

    /// The plain JSON form, without the logging wrapper.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Id(id) => Value::String(id.to_string()),
            Self::Opaque(v) => v.clone(),
        }
    }

    fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Text(_) => Some("StringValue"),
            Self::Number(_) => Some("NumberValue"),
            Self::Bool(_) => Some("BoolValue"),
            Self::Id(_) => Some("GuidValue"),
            Self::Opaque(_) => None,
        }
    }
}

impl Serialize for LogValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.tag() {
            Some(tag) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(tag, &self.to_json())?;
                map.end()
            }
            None => self.to_json().serialize(serializer),
        }
    }
}

impl std::fmt::Display for LogValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unrenderable>"),
        }
    }
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for LogValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Uuid> for LogValue {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

impl From<f64> for LogValue {
    fn from(n: f64) -> Self {
        match Number::from_f64(n) {
            Some(n) => Self::Number(n),
            None => Self::Text(n.to_string()),
        }
    }
}

impl From<Value> for LogValue {
    fn from(v: Value) -> Self {
        Self::from_json(v)
    }
}

macro_rules! int_log_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for LogValue {
                fn from(n: $t) -> Self {
                    Self::Number(Number::from(n))
                }
            }
        )*
    };
}

int_log_value!(i8, i16, i32, i64, u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_primitives_dispatch_to_wrapped_variants() {
        assert_eq!(LogValue::from_json(json!("a")), LogValue::Text("a".into()));
        assert_eq!(LogValue::from_json(json!(3)), LogValue::Number(3.into()));
        assert_eq!(LogValue::from_json(json!(true)), LogValue::Bool(true));
    }

    #[test]
    fn objects_arrays_and_null_stay_opaque() {
        for v in [json!({"a": 1}), json!([1, 2]), Value::Null] {
            assert_eq!(LogValue::from_json(v.clone()), LogValue::Opaque(v));
        }
    }

    #[test]
    fn primitives_serialize_with_a_tag() {
        assert_eq!(serde_json::to_value(LogValue::from("x")).unwrap(), json!({"StringValue": "x"}));
        assert_eq!(serde_json::to_value(LogValue::from(7u32)).unwrap(), json!({"NumberValue": 7}));
        assert_eq!(serde_json::to_value(LogValue::from(2.5)).unwrap(), json!({"NumberValue": 2.5}));
        assert_eq!(serde_json::to_value(LogValue::from(false)).unwrap(), json!({"BoolValue": false}));

        let id = Uuid::nil();
        assert_eq!(
            serde_json::to_value(LogValue::from(id)).unwrap(),
            json!({"GuidValue": "00000000-0000-0000-0000-000000000000"})
        );
    }

    #[test]
    fn opaque_serializes_untouched() {
        let v = json!({"order": {"id": 1}});
        assert_eq!(serde_json::to_value(LogValue::Opaque(v.clone())).unwrap(), v);
    }

    #[test]
    fn capture_serializes_structs() {
        #[derive(serde::Serialize)]
        struct Order {
            id: u32,
        }
        assert_eq!(LogValue::capture(&Order { id: 9 }), LogValue::Opaque(json!({"id": 9})));
        assert_eq!(LogValue::capture("plain"), LogValue::Text("plain".into()));
    }

    #[test]
    fn non_finite_floats_fall_back_to_text() {
        assert_eq!(LogValue::from(f64::NAN), LogValue::Text("NaN".into()));
    }

    #[test]
    fn display_renders_the_wrapped_form() {
        assert_eq!(LogValue::from("hi").to_string(), r#"{"StringValue":"hi"}"#);
    }

    #[test]
    fn to_json_strips_the_wrapper() {
        assert_eq!(LogValue::from(Uuid::nil()).to_json(), json!("00000000-0000-0000-0000-000000000000"));
    }
}
