//! Request context passed through dispatch.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// An unrecognized method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    /// Parses a method name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated parameter values keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    values: Map<String, Value>,
}

impl Values {
    /// Creates an empty set of values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Gets a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Gets a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Gets a numeric value.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Gets an integral numeric value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Gets a boolean value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the values as a JSON map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

impl From<Map<String, Value>> for Values {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// The per-request context seen by the router and handlers.
///
/// The host fills in `method`, `path`, `raw_query` and `body`; the router
/// writes `params` and `query` before invoking a handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub raw_query: Option<String>,
    /// Request body.
    pub body: Value,
    /// Validated path parameters.
    pub params: Values,
    /// Validated query parameters.
    pub query: Values,
}

impl Context {
    /// Creates a context from a request target, splitting off any query
    /// string.
    pub fn new(method: Method, target: impl AsRef<str>) -> Self {
        let (path, raw_query) = split_target(target.as_ref());
        Self {
            method,
            path: path.to_string(),
            raw_query: raw_query.map(str::to_string),
            body: Value::Null,
            params: Values::new(),
            query: Values::new(),
        }
    }

    /// Creates a GET context.
    pub fn get(target: impl AsRef<str>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Creates a POST context.
    pub fn post(target: impl AsRef<str>) -> Self {
        Self::new(Method::Post, target)
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn raw_query(mut self, query: impl Into<String>) -> Self {
        self.raw_query = Some(query.into());
        self
    }
}

/// Splits a request target at the first `?`.
pub(crate) fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert_eq!("post".parse::<Method>(), Ok(Method::Post));
        assert_eq!("Delete".parse::<Method>(), Ok(Method::Delete));
        assert!("INVALID".parse::<Method>().is_err());
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_values() {
        let mut values = Values::new();
        values.insert("id", json!(123));
        values.insert("name", json!("test"));
        values.insert("flag", json!(false));

        assert_eq!(values.get_i64("id"), Some(123));
        assert_eq!(values.get_f64("id"), Some(123.0));
        assert_eq!(values.get_str("name"), Some("test"));
        assert_eq!(values.get_bool("flag"), Some(false));
        assert_eq!(values.get("missing"), None);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_context_splits_query() {
        let ctx = Context::get("/foo/str?bar=str");
        assert_eq!(ctx.path, "/foo/str");
        assert_eq!(ctx.raw_query.as_deref(), Some("bar=str"));

        let ctx = Context::post("/users").body(json!({"name": "a"}));
        assert_eq!(ctx.method, Method::Post);
        assert!(ctx.raw_query.is_none());
        assert_eq!(ctx.body["name"], "a");
    }
}
