//! Resolving a request path and query string against a compiled route.

use std::borrow::Cow;

use crate::compile::CompiledRoute;
use crate::context::{split_target, Values};
use crate::error::{Location, ValidationError};
use crate::schema::SchemaError;

/// Values extracted from a matching request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// Validated path parameters.
    pub params: Values,
    /// Validated query parameters that were present in the request.
    pub query: Values,
}

/// Matches a request against a route and validates what it extracts.
///
/// `raw_path` may still carry a query string, in which case it is split off
/// and used when `raw_query` is `None`.
///
/// Returns `Ok(None)` when the path does not have the route's shape, and a
/// [`ValidationError`] when it does but a value fails its schema. Query keys
/// the route does not declare are ignored; declared keys that are absent
/// are left out of the result.
///
/// # Example
///
/// ```
/// use boiling_router::{resolve_source, CompiledRoute, TypeRegistry};
/// use serde_json::json;
///
/// let route = CompiledRoute::new("/foo/:foo?bar(number)", &TypeRegistry::new()).unwrap();
/// let result = resolve_source("/foo/str?bar=2", None, &route).unwrap().unwrap();
/// assert_eq!(result.params.get("foo"), Some(&json!("str")));
/// assert_eq!(result.query.get("bar"), Some(&json!(2)));
/// ```
pub fn resolve_source(
    raw_path: &str,
    raw_query: Option<&str>,
    route: &CompiledRoute,
) -> Result<Option<MatchResult>, ValidationError> {
    let (path, embedded_query) = split_target(raw_path);
    let raw_query = raw_query.or(embedded_query);

    let Some(caps) = route.regex().captures(path) else {
        return Ok(None);
    };

    let mut params = Values::new();
    for (name, schema) in route.params() {
        let raw = caps.name(name).map_or("", |m| m.as_str());
        let value = decode(raw, false)
            .and_then(|text| schema.coerce(&text))
            .map_err(|e| ValidationError::new(Location::Path, name, e))?;
        params.insert(name, value);
    }

    let pairs = query_pairs(raw_query.unwrap_or_default());
    let mut query = Values::new();
    for (name, schema) in route.query() {
        let occurrences = pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, raw)| decode(raw, true))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ValidationError::new(Location::Query, name, e))?;
        if occurrences.is_empty() {
            continue;
        }

        let texts: Vec<&str> = occurrences.iter().map(String::as_str).collect();
        let value = schema
            .coerce_many(&texts)
            .map_err(|e| ValidationError::new(Location::Query, name, e))?;
        query.insert(name, value);
    }

    Ok(Some(MatchResult { params, query }))
}

/// Parses a query string into decoded key/value pairs, in order.
///
/// Repeated keys are kept; `+` decodes to a space; invalid UTF-8 is replaced.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    query_pairs(query)
        .into_iter()
        .map(|(key, raw)| (key, decode_lossy(raw, true)))
        .collect()
}

/// Splits a query string into pairs with decoded keys and raw values.
fn query_pairs(query: &str) -> Vec<(String, &str)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                return None;
            }
            Some((decode_lossy(key, true), value))
        })
        .collect()
}

fn plus_to_space(raw: &str, form: bool) -> Cow<'_, str> {
    if form && raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Percent-decodes `raw`; `form` also turns `+` into a space.
fn decode(raw: &str, form: bool) -> Result<String, SchemaError> {
    urlencoding::decode(&plus_to_space(raw, form))
        .map(Cow::into_owned)
        .map_err(|_| SchemaError::new("UTF-8 text", raw))
}

fn decode_lossy(raw: &str, form: bool) -> String {
    let spaced = plus_to_space(raw, form);
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::schema;
    use serde_json::json;

    fn route(pattern: &str) -> CompiledRoute {
        CompiledRoute::new(pattern, &TypeRegistry::new()).unwrap()
    }

    fn resolve(path: &str, pattern: &str) -> MatchResult {
        resolve_source(path, None, &route(pattern))
            .unwrap()
            .unwrap_or_else(|| panic!("{path} should match {pattern}"))
    }

    #[test]
    fn test_resolve_untyped() {
        let result = resolve("/foo/hi", "/foo/:foo");
        assert_eq!(result.params.get_str("foo"), Some("hi"));
        assert!(resolve("/foo/bar", "/foo/bar").params.is_empty());
    }

    #[test]
    fn test_resolve_numbers() {
        let pattern = "/foo/:foo(number)";
        for (path, value) in [
            ("/foo/123", 123.0),
            ("/foo/0.123", 0.123),
            ("/foo/+23", 23.0),
            ("/foo/-23", -23.0),
        ] {
            assert_eq!(resolve(path, pattern).params.get_f64("foo"), Some(value), "{path}");
        }
    }

    #[test]
    fn test_resolve_booleans() {
        let pattern = "/flag/:on(boolean)";
        assert_eq!(resolve("/flag/true", pattern).params.get_bool("on"), Some(true));
        assert_eq!(resolve("/flag/0", pattern).params.get_bool("on"), Some(false));
        assert!(resolve_source("/flag/yes", None, &route(pattern))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_no_match() {
        let compiled = route("/foo/:foo(number)");
        assert_eq!(resolve_source("/foo/abc", None, &compiled), Ok(None));
        assert_eq!(resolve_source("/bar/1", None, &compiled), Ok(None));
        assert_eq!(resolve_source("/foo/1/2", None, &compiled), Ok(None));
    }

    #[test]
    fn test_resolve_query() {
        let result = resolve("/foo/str?bar=str", "/foo/:foo?bar");
        assert_eq!(result.params.get_str("foo"), Some("str"));
        assert_eq!(result.query.get_str("bar"), Some("str"));
    }

    #[test]
    fn test_query_is_optional() {
        let result = resolve("/foo", "/foo?bar(number)&baz");
        assert!(result.query.is_empty());

        let result = resolve("/foo?other=1&baz=x", "/foo?bar(number)&baz");
        assert!(!result.query.contains("bar"));
        assert!(!result.query.contains("other"));
        assert_eq!(result.query.get_str("baz"), Some("x"));
    }

    #[test]
    fn test_explicit_query_argument() {
        let compiled = route("/foo?bar(number)");
        let result = resolve_source("/foo", Some("bar=-1.5"), &compiled)
            .unwrap()
            .unwrap();
        assert_eq!(result.query.get("bar"), Some(&json!(-1.5)));
    }

    #[test]
    fn test_invalid_query_value() {
        let compiled = route("/foo?bar(number)");
        let err = resolve_source("/foo?bar=abc", None, &compiled).unwrap_err();
        assert_eq!(err.location, Location::Query);
        assert_eq!(err.name, "bar");
        assert_eq!(err.source.expected, "number");
        assert_eq!(err.source.actual, json!("abc"));
    }

    #[test]
    fn test_path_validation_failure_is_not_a_miss() {
        let registry = TypeRegistry::new();
        // Fragment wider than the schema.
        registry.register("even", schema::literal(2), r"[0-9]+");
        let compiled = CompiledRoute::new("/n/:n(even)", &registry).unwrap();

        assert!(resolve_source("/n/2", None, &compiled).unwrap().is_some());
        let err = resolve_source("/n/3", None, &compiled).unwrap_err();
        assert_eq!(err.location, Location::Path);
        assert_eq!(err.name, "n");
    }

    #[test]
    fn test_percent_decoding() {
        let result = resolve("/files/hello%20world?q=a+b%26c", "/files/:name?q");
        assert_eq!(result.params.get_str("name"), Some("hello world"));
        assert_eq!(result.query.get_str("q"), Some("a b&c"));

        let result = resolve("/files/a+b", "/files/:name");
        assert_eq!(result.params.get_str("name"), Some("a+b"));
    }

    #[test]
    fn test_invalid_utf8_is_a_validation_error() {
        let err = resolve_source("/files/%FF", None, &route("/files/:name")).unwrap_err();
        assert_eq!(err.location, Location::Path);
        assert_eq!(err.source.expected, "UTF-8 text");
    }

    #[test]
    fn test_repeated_query_keys() {
        let result = resolve("/s?page=1&page=2", "/s?page(number)");
        assert_eq!(result.query.get_i64("page"), Some(2));

        let registry = TypeRegistry::new();
        registry.register("tags", schema::array(schema::string()), r"[^/&?]+");
        let compiled = CompiledRoute::new("/s?tag(tags)", &registry).unwrap();
        let result = resolve_source("/s?tag=b&x=1&tag=a", None, &compiled)
            .unwrap()
            .unwrap();
        assert_eq!(result.query.get("tag"), Some(&json!(["b", "a"])));
    }

    #[test]
    fn test_query_string_parsing_replaces_invalid_utf8() {
        let query = parse_query_string("k%20ey=%FF+x");
        assert_eq!(query, [("k ey".to_string(), "\u{FFFD} x".to_string())]);
    }

    #[test]
    fn test_query_string_parsing() {
        let query = parse_query_string("name=John+Doe&age=30&city=New%20York&flag&&=x");
        assert_eq!(
            query,
            [
                ("name".to_string(), "John Doe".to_string()),
                ("age".to_string(), "30".to_string()),
                ("city".to_string(), "New York".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
