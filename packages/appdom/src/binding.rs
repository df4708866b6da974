//! # Bindable Values
//!
//! Attribute values are either literals or references resolved at runtime.
//!
//! ```text
//! 42                              → Const(42)
//! { $$jsExpression: "a.value" }   → JsExpression("a.value")
//! { $$env: "API_KEY" }            → Env("API_KEY")
//! ```
//!
//! The serialized form is the same in JSON diffs and YAML page files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const JS_EXPRESSION_KEY: &str = "$$jsExpression";
pub const ENV_KEY: &str = "$$env";
pub const TEMPLATE_KEY: &str = "$$template";

/// A literal value or a binding expression
#[derive(Debug, Clone, PartialEq)]
pub enum BindableValue {
    /// Literal JSON value
    Const(Value),

    /// Expression evaluated against other nodes' runtime output
    JsExpression(String),

    /// Reference to an environment variable
    Env(String),
}

impl BindableValue {
    pub fn string(value: impl Into<String>) -> Self {
        BindableValue::Const(Value::String(value.into()))
    }

    pub fn expression(source: impl Into<String>) -> Self {
        BindableValue::JsExpression(source.into())
    }

    pub fn env(variable: impl Into<String>) -> Self {
        BindableValue::Env(variable.into())
    }

    /// Name of the referenced environment variable, if this is an env binding
    pub fn env_var(&self) -> Option<&str> {
        match self {
            BindableValue::Env(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<&Value> {
        match self {
            BindableValue::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Interpret a raw JSON value, recognizing the binding wrappers.
    pub fn from_json(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(Value::String(source)) = map.get(JS_EXPRESSION_KEY) {
                    return BindableValue::JsExpression(source.clone());
                }
                if let Some(Value::String(name)) = map.get(ENV_KEY) {
                    return BindableValue::Env(name.clone());
                }
            }
        }
        BindableValue::Const(value)
    }

    pub fn to_json(&self) -> Value {
        match self {
            BindableValue::Const(value) => value.clone(),
            BindableValue::JsExpression(source) => wrap(JS_EXPRESSION_KEY, source),
            BindableValue::Env(name) => wrap(ENV_KEY, name),
        }
    }
}

fn wrap(key: &str, value: &str) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), Value::String(value.to_string()));
    Value::Object(map)
}

impl From<Value> for BindableValue {
    fn from(value: Value) -> Self {
        BindableValue::from_json(value)
    }
}

impl Serialize for BindableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BindableValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(BindableValue::from_json)
    }
}
