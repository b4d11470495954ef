//! Value schemas used to validate and coerce route parameters.
//!
//! A [`Schema`] checks an already-typed [`Value`] with [`Schema::validate`]
//! and turns raw URL text into a typed value with [`Schema::coerce`].
//! The built-in schemas back the `string`, `number` and `boolean` parameter
//! types; [`LiteralSchema`], [`UnionSchema`] and [`ArraySchema`] compose them
//! into domain-specific types.
//!
//! # Example
//!
//! ```
//! use boiling_router::schema::{self, Schema};
//! use serde_json::json;
//!
//! // A user id: either a number or the literal `@me`.
//! let uid = schema::union([schema::number(), schema::literal("@me")]);
//! assert_eq!(uid.coerce("42").unwrap(), json!(42));
//! assert_eq!(uid.coerce("@me").unwrap(), json!("@me"));
//! assert!(uid.coerce("bob").is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};
use thiserror::Error;

/// A value did not match what the schema expects.
///
/// Carries the expected kind and the offending value; the message is
/// rendered as `expected <kind> but got <value>`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected} but got {actual}")]
pub struct SchemaError {
    /// Description of the accepted kind.
    pub expected: String,
    /// The value that was rejected.
    pub actual: Value,
}

impl SchemaError {
    /// Creates a new schema error.
    pub fn new(expected: impl Into<String>, actual: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Trait for value schemas.
pub trait Schema: fmt::Debug + Send + Sync {
    /// Human-readable description of the accepted kind.
    fn expected(&self) -> String;

    /// Validates an already-typed value.
    fn validate(&self, value: &Value) -> Result<Value, SchemaError>;

    /// Coerces raw, percent-decoded text into a typed value.
    fn coerce(&self, raw: &str) -> Result<Value, SchemaError>;

    /// Coerces every occurrence of a repeated query key.
    ///
    /// The default keeps the last occurrence.
    fn coerce_many(&self, raws: &[&str]) -> Result<Value, SchemaError> {
        match raws.last() {
            Some(raw) => self.coerce(raw),
            None => Err(SchemaError::new(self.expected(), Value::Null)),
        }
    }
}

/// A shared schema.
pub type SchemaRef = Arc<dyn Schema>;

/// Accepts any string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringSchema;

impl Schema for StringSchema {
    fn expected(&self) -> String {
        "string".to_string()
    }

    fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        match value {
            Value::String(_) => Ok(value.clone()),
            other => Err(SchemaError::new(self.expected(), other.clone())),
        }
    }

    fn coerce(&self, raw: &str) -> Result<Value, SchemaError> {
        Ok(Value::String(raw.to_string()))
    }
}

/// Accepts numbers; coerces text with double-precision semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberSchema;

impl NumberSchema {
    /// Converts a double into a JSON number, preferring an integer
    /// representation when the value is integral.
    fn to_value(n: f64) -> Option<Value> {
        // 2^63 bounds the range where the `as` conversion is exact.
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        if n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n) {
            #[allow(clippy::cast_possible_truncation)]
            return Some(Value::from(n as i64));
        }
        Number::from_f64(n).map(Value::Number)
    }
}

impl Schema for NumberSchema {
    fn expected(&self) -> String {
        "number".to_string()
    }

    fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        match value {
            Value::Number(_) => Ok(value.clone()),
            other => Err(SchemaError::new(self.expected(), other.clone())),
        }
    }

    fn coerce(&self, raw: &str) -> Result<Value, SchemaError> {
        raw.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .and_then(Self::to_value)
            .ok_or_else(|| SchemaError::new(self.expected(), raw))
    }
}

/// Accepts booleans; coerces exactly `true`, `false`, `1` and `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanSchema;

impl Schema for BooleanSchema {
    fn expected(&self) -> String {
        "boolean".to_string()
    }

    fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            other => Err(SchemaError::new(self.expected(), other.clone())),
        }
    }

    fn coerce(&self, raw: &str) -> Result<Value, SchemaError> {
        match raw {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(SchemaError::new(self.expected(), raw)),
        }
    }
}

/// Accepts exactly one value.
#[derive(Debug, Clone)]
pub struct LiteralSchema {
    value: Value,
}

impl LiteralSchema {
    /// Creates a literal schema.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    fn text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Schema for LiteralSchema {
    fn expected(&self) -> String {
        self.value.to_string()
    }

    fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        if *value == self.value {
            Ok(value.clone())
        } else {
            Err(SchemaError::new(self.expected(), value.clone()))
        }
    }

    fn coerce(&self, raw: &str) -> Result<Value, SchemaError> {
        if raw == self.text() {
            Ok(self.value.clone())
        } else {
            Err(SchemaError::new(self.expected(), raw))
        }
    }
}

/// Accepts a value matching any member; the first accepting member wins.
#[derive(Debug, Clone)]
pub struct UnionSchema {
    members: Vec<SchemaRef>,
}

impl UnionSchema {
    /// Creates a union of the given schemas.
    pub fn new(members: impl IntoIterator<Item = SchemaRef>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    fn first_ok(
        &self,
        actual: impl Fn() -> Value,
        f: impl Fn(&SchemaRef) -> Result<Value, SchemaError>,
    ) -> Result<Value, SchemaError> {
        self.members
            .iter()
            .find_map(|member| f(member).ok())
            .ok_or_else(|| SchemaError::new(self.expected(), actual()))
    }
}

impl Schema for UnionSchema {
    fn expected(&self) -> String {
        self.members
            .iter()
            .map(|m| m.expected())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        self.first_ok(|| value.clone(), |m| m.validate(value))
    }

    fn coerce(&self, raw: &str) -> Result<Value, SchemaError> {
        self.first_ok(|| Value::from(raw), |m| m.coerce(raw))
    }
}

/// Accepts an array of items; collects repeated query keys in order.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    item: SchemaRef,
}

impl ArraySchema {
    /// Creates an array schema over `item`.
    pub fn new(item: SchemaRef) -> Self {
        Self { item }
    }
}

impl Schema for ArraySchema {
    fn expected(&self) -> String {
        format!("{}[]", self.item.expected())
    }

    fn validate(&self, value: &Value) -> Result<Value, SchemaError> {
        let Value::Array(items) = value else {
            return Err(SchemaError::new(self.expected(), value.clone()));
        };
        items
            .iter()
            .map(|item| self.item.validate(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn coerce(&self, raw: &str) -> Result<Value, SchemaError> {
        self.coerce_many(&[raw])
    }

    fn coerce_many(&self, raws: &[&str]) -> Result<Value, SchemaError> {
        raws.iter()
            .map(|raw| self.item.coerce(raw))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// Returns a shared [`StringSchema`].
pub fn string() -> SchemaRef {
    Arc::new(StringSchema)
}

/// Returns a shared [`NumberSchema`].
pub fn number() -> SchemaRef {
    Arc::new(NumberSchema)
}

/// Returns a shared [`BooleanSchema`].
pub fn boolean() -> SchemaRef {
    Arc::new(BooleanSchema)
}

/// Returns a shared [`LiteralSchema`].
pub fn literal(value: impl Into<Value>) -> SchemaRef {
    Arc::new(LiteralSchema::new(value))
}

/// Returns a shared [`UnionSchema`].
pub fn union(members: impl IntoIterator<Item = SchemaRef>) -> SchemaRef {
    Arc::new(UnionSchema::new(members))
}

/// Returns a shared [`ArraySchema`].
pub fn array(item: SchemaRef) -> SchemaRef {
    Arc::new(ArraySchema::new(item))
}
