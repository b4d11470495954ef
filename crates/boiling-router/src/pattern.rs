//! Route pattern parsing.
//!
//! Pattern syntax:
//! - `/users` - Literal path
//! - `/users/:id` - Path parameter, typed as `string`
//! - `/users/:id(number)` - Path parameter with a declared type
//! - `/search?q&page(number)` - Optional query parameters
//!
//! Parsing is purely syntactic: type names are looked up when the pattern
//! is compiled against a [`TypeRegistry`](crate::TypeRegistry).

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Location, ParseError};

/// Type assigned to parameters without an annotation.
pub const DEFAULT_TYPE: &str = "string";

/// Describes one path or query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Declared type name.
    pub type_name: String,
    /// Whether the parameter may be absent. Always `false` for path
    /// parameters.
    pub optional: bool,
}

/// A segment in a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal string segment.
    Literal(String),
    /// A parameter segment (e.g., `:id(number)`).
    Param(ParamSpec),
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// The original pattern string.
    source: String,
    /// Path segments, left to right.
    segments: Vec<Segment>,
    /// Query parameters in declaration order.
    query: Vec<ParamSpec>,
}

impl RoutePattern {
    /// Parses a pattern string.
    ///
    /// # Example
    ///
    /// ```
    /// use boiling_router::RoutePattern;
    ///
    /// let pattern = RoutePattern::parse("/foo/:foo(number)?bar(number)&baz").unwrap();
    /// let foo = pattern.params().next().unwrap();
    /// assert_eq!((foo.name.as_str(), foo.type_name.as_str()), ("foo", "number"));
    /// assert_eq!(pattern.query_param("baz").unwrap().type_name, "string");
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, ParseError> {
        let (path, query) = match pattern.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (pattern, None),
        };

        let segments = parse_path(path)?;
        let query = match query {
            Some(query) => parse_query(query, path.len() + 1)?,
            None => Vec::new(),
        };

        Ok(Self {
            source: pattern.to_string(),
            segments,
            query,
        })
    }

    /// Returns the original pattern string.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the path segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the path parameters in order.
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(spec) => Some(spec),
            Segment::Literal(_) => None,
        })
    }

    /// Returns the query parameters.
    pub fn query(&self) -> &[ParamSpec] {
        &self.query
    }

    /// Looks up a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&ParamSpec> {
        self.query.iter().find(|spec| spec.name == name)
    }

    /// Generates a path from parameter values, percent-encoding each one.
    ///
    /// Returns `None` if a path parameter is missing.
    ///
    /// # Example
    ///
    /// ```
    /// use boiling_router::RoutePattern;
    /// use serde_json::json;
    ///
    /// let pattern = RoutePattern::parse("/posts/:id(number)/:slug").unwrap();
    /// let params = json!({"id": 7, "slug": "hello world"});
    /// let path = pattern.reverse(params.as_object().unwrap()).unwrap();
    /// assert_eq!(path, "/posts/7/hello%20world");
    /// ```
    pub fn reverse(&self, params: &Map<String, Value>) -> Option<String> {
        let mut path = String::new();

        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(s) => path.push_str(s),
                Segment::Param(spec) => {
                    let text = match params.get(&spec.name)? {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    path.push_str(&urlencoding::encode(&text));
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        }

        Some(path)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_path(path: &str) -> Result<Vec<Segment>, ParseError> {
    if path.is_empty() || path == "/" {
        return Ok(Vec::new());
    }
    let Some(body) = path.strip_prefix('/') else {
        return Err(ParseError::MissingLeadingSlash(path.to_string()));
    };

    let mut segments = Vec::new();
    let mut seen = HashSet::new();
    let mut position = 1;

    for part in body.split('/') {
        if part.is_empty() {
            return Err(ParseError::EmptySegment { position });
        }

        if let Some(item) = part.strip_prefix(':') {
            let spec = parse_item(item, position + 1, false)?;
            if !seen.insert(spec.name.clone()) {
                return Err(ParseError::DuplicateName {
                    name: spec.name,
                    location: Location::Path,
                });
            }
            segments.push(Segment::Param(spec));
        } else {
            segments.push(Segment::Literal(part.to_string()));
        }

        position += part.len() + 1;
    }

    Ok(segments)
}

fn parse_query(query: &str, offset: usize) -> Result<Vec<ParamSpec>, ParseError> {
    let mut items: Vec<ParamSpec> = Vec::new();
    let mut position = offset;

    for item in query.split('&') {
        if item.is_empty() {
            return Err(ParseError::EmptyQueryItem { position });
        }

        let spec = parse_item(item, position, true)?;
        if items.iter().any(|existing| existing.name == spec.name) {
            return Err(ParseError::DuplicateName {
                name: spec.name,
                location: Location::Query,
            });
        }
        items.push(spec);

        position += item.len() + 1;
    }

    Ok(items)
}

/// Parses `name` or `name(type)`; `position` is the offset of `name`.
fn parse_item(item: &str, position: usize, optional: bool) -> Result<ParamSpec, ParseError> {
    let (name, type_name) = match item.find('(') {
        None => {
            if let Some(close) = item.find(')') {
                return Err(ParseError::MalformedBrackets {
                    position: position + close,
                });
            }
            (item, DEFAULT_TYPE)
        }
        Some(open) => {
            let inner = &item[open + 1..];
            let Some(close) = inner.find(')') else {
                return Err(ParseError::UnterminatedType {
                    position: position + open,
                });
            };
            let type_name = &inner[..close];
            if type_name.is_empty() || type_name.contains('(') || close + 1 != inner.len() {
                return Err(ParseError::MalformedBrackets {
                    position: position + open,
                });
            }
            check_name(type_name, position + open + 1)?;
            (&item[..open], type_name)
        }
    };

    if name.is_empty() {
        return Err(ParseError::MissingName { position });
    }
    check_name(name, position)?;

    Ok(ParamSpec {
        name: name.to_string(),
        type_name: type_name.to_string(),
        optional,
    })
}

fn check_name(name: &str, position: usize) -> Result<(), ParseError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ParseError::InvalidName {
            name: name.to_string(),
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, type_name: &str) -> Segment {
        Segment::Param(ParamSpec {
            name: name.to_string(),
            type_name: type_name.to_string(),
            optional: false,
        })
    }

    #[test]
    fn test_literal_path() {
        let pattern = RoutePattern::parse("/foo/bar").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("foo".to_string()),
                Segment::Literal("bar".to_string())
            ]
        );
        assert!(pattern.query().is_empty());
    }

    #[test]
    fn test_untyped_param_defaults_to_string() {
        let pattern = RoutePattern::parse("/foo/:foo").unwrap();
        assert_eq!(pattern.segments()[1], param("foo", "string"));
    }

    #[test]
    fn test_multi_param_with_query() {
        let pattern = RoutePattern::parse("/foo/:foo(number)/:fuu?bar(number)&baz").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("foo".to_string()),
                param("foo", "number"),
                param("fuu", "string"),
            ]
        );

        let bar = pattern.query_param("bar").unwrap();
        assert_eq!(bar.type_name, "number");
        assert!(bar.optional);
        assert_eq!(pattern.query_param("baz").unwrap().type_name, "string");
    }

    #[test]
    fn test_root_pattern() {
        assert!(RoutePattern::parse("/").unwrap().segments().is_empty());
        assert!(RoutePattern::parse("").unwrap().segments().is_empty());
        let pattern = RoutePattern::parse("/?page(number)").unwrap();
        assert!(pattern.segments().is_empty());
        assert_eq!(pattern.query().len(), 1);
    }

    #[test]
    fn test_unknown_type_is_syntactically_valid() {
        let pattern = RoutePattern::parse("/u/:id(uid)").unwrap();
        assert_eq!(pattern.segments()[1], param("id", "uid"));
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(
            RoutePattern::parse("/foo/:"),
            Err(ParseError::MissingName { position: 6 })
        );
        assert!(matches!(
            RoutePattern::parse("/foo/:(number)"),
            Err(ParseError::MissingName { .. })
        ));
    }

    #[test]
    fn test_bracket_errors() {
        assert_eq!(
            RoutePattern::parse("/foo/:id(number"),
            Err(ParseError::UnterminatedType { position: 8 })
        );
        for pattern in [
            "/foo/:id(num(ber))",
            "/foo/:id()",
            "/foo/:id)",
            "/foo/:id(number)x",
            "/foo?bar(number",
        ] {
            let err = RoutePattern::parse(pattern).unwrap_err();
            assert!(
                matches!(
                    err,
                    ParseError::MalformedBrackets { .. } | ParseError::UnterminatedType { .. }
                ),
                "{pattern}: {err:?}"
            );
        }
    }

    #[test]
    fn test_duplicate_names() {
        assert!(matches!(
            RoutePattern::parse("/:id/:id(number)"),
            Err(ParseError::DuplicateName {
                location: Location::Path,
                ..
            })
        ));
        assert!(matches!(
            RoutePattern::parse("/x?a&a(number)"),
            Err(ParseError::DuplicateName {
                location: Location::Query,
                ..
            })
        ));
        // Path and query are separate namespaces.
        assert!(RoutePattern::parse("/:id?id").is_ok());
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            RoutePattern::parse("foo/bar"),
            Err(ParseError::MissingLeadingSlash(_))
        ));
        assert_eq!(
            RoutePattern::parse("/foo//bar"),
            Err(ParseError::EmptySegment { position: 5 })
        );
        assert!(matches!(
            RoutePattern::parse("/foo/"),
            Err(ParseError::EmptySegment { .. })
        ));
        assert!(matches!(
            RoutePattern::parse("/foo?a&&b"),
            Err(ParseError::EmptyQueryItem { position: 7 })
        ));
        assert!(matches!(
            RoutePattern::parse("/foo/:my-id"),
            Err(ParseError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_reverse() {
        let pattern = RoutePattern::parse("/posts/:id(number)").unwrap();
        let params = serde_json::json!({"id": 123});
        assert_eq!(
            pattern.reverse(params.as_object().unwrap()),
            Some("/posts/123".to_string())
        );
    }

    #[test]
    fn test_reverse_missing_param() {
        let pattern = RoutePattern::parse("/posts/:id").unwrap();
        assert!(pattern.reverse(&Map::new()).is_none());
    }
}
