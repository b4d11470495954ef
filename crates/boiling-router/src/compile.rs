//! Compiling route patterns into matchers.

use regex::Regex;

use crate::error::{CompileError, Location, ParseError};
use crate::pattern::{RoutePattern, Segment};
use crate::registry::TypeRegistry;
use crate::schema::SchemaRef;

/// A path segment with its type already resolved.
#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Param {
        name: String,
        fragment: String,
        schema: SchemaRef,
    },
}

/// The matcher derived from a [`RoutePattern`].
///
/// Schemas and regex fragments are captured at compile time; later changes
/// to the registry do not affect an existing `CompiledRoute`.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pattern: String,
    parts: Vec<Part>,
    regex: Regex,
    query: Vec<(String, SchemaRef)>,
}

impl CompiledRoute {
    /// Parses and compiles a pattern string.
    pub fn new(pattern: &str, registry: &TypeRegistry) -> crate::Result<Self> {
        let parsed = RoutePattern::parse(pattern)?;
        Ok(compile(&parsed, registry)?)
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the anchored path regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Returns path parameter names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params().map(|(name, _)| name)
    }

    /// Returns path parameter names with their schemas, in order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &SchemaRef)> {
        self.parts.iter().filter_map(|part| match part {
            Part::Param { name, schema, .. } => Some((name.as_str(), schema)),
            Part::Literal(_) => None,
        })
    }

    /// Returns declared query keys with their schemas.
    pub fn query(&self) -> impl Iterator<Item = (&str, &SchemaRef)> {
        self.query.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Returns the schema for a path parameter.
    pub fn param_schema(&self, name: &str) -> Option<&SchemaRef> {
        self.params().find(|(n, _)| *n == name).map(|(_, s)| s)
    }

    /// Returns the schema for a query key.
    pub fn query_schema(&self, name: &str) -> Option<&SchemaRef> {
        self.query().find(|(n, _)| *n == name).map(|(_, s)| s)
    }

    /// Replaces path parameter schemas positionally, keeping the regex.
    pub fn override_params(&mut self, schemas: Vec<SchemaRef>) -> Result<(), CompileError> {
        let expected = self.param_names().count();
        if schemas.len() != expected {
            return Err(CompileError::ParamCountMismatch {
                expected,
                found: schemas.len(),
            });
        }

        let mut schemas = schemas.into_iter();
        for part in &mut self.parts {
            if let Part::Param { schema, .. } = part {
                if let Some(next) = schemas.next() {
                    *schema = next;
                }
            }
        }
        Ok(())
    }

    /// Returns a copy of this route with `prefix` prepended.
    ///
    /// The prefix is a path-only pattern; its parameter types are resolved
    /// against `registry`, while this route keeps its own resolved types.
    pub fn prefixed(&self, prefix: &str, registry: &TypeRegistry) -> crate::Result<Self> {
        let prefix = prefix.trim_end_matches('/');
        let parsed = RoutePattern::parse(prefix)?;
        if !parsed.query().is_empty() {
            return Err(ParseError::QueryInPrefix(prefix.to_string()).into());
        }

        let mut parts = resolve_parts(&parsed, registry)?;
        for part in &self.parts {
            if let Part::Param { name, .. } = part {
                if parsed.params().any(|spec| spec.name == *name) {
                    return Err(ParseError::DuplicateName {
                        name: name.clone(),
                        location: Location::Path,
                    }
                    .into());
                }
            }
        }
        parts.extend(self.parts.iter().cloned());

        let pattern = join_prefix(prefix, &self.pattern)?;
        let regex = build_regex(&pattern, &parts)?;
        Ok(Self {
            pattern,
            parts,
            regex,
            query: self.query.clone(),
        })
    }
}

/// Compiles a parsed pattern against a registry.
///
/// # Example
///
/// ```
/// use boiling_router::{compile, RoutePattern, TypeRegistry};
///
/// let pattern = RoutePattern::parse("/foo/:foo(number)").unwrap();
/// let route = compile(&pattern, &TypeRegistry::new()).unwrap();
/// assert!(route.regex().is_match("/foo/-10.01"));
/// assert!(!route.regex().is_match("/foo/abc"));
/// assert!(!route.regex().is_match("/foo/1/"));
/// ```
pub fn compile(
    pattern: &RoutePattern,
    registry: &TypeRegistry,
) -> Result<CompiledRoute, CompileError> {
    let parts = resolve_parts(pattern, registry)?;
    let regex = build_regex(pattern.source(), &parts)?;

    let query = pattern
        .query()
        .iter()
        .map(|spec| {
            registry
                .resolve(&spec.type_name)
                .map(|descriptor| (spec.name.clone(), descriptor.schema))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledRoute {
        pattern: pattern.source().to_string(),
        parts,
        regex,
        query,
    })
}

/// Concatenates a router prefix and a pattern.
///
/// A trailing `/` on the prefix is ignored. With a non-empty prefix the
/// pattern must start with `/` or `?`.
pub(crate) fn join_prefix(prefix: &str, pattern: &str) -> Result<String, ParseError> {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return Ok(if pattern.is_empty() { "/" } else { pattern }.to_string());
    }

    let joined = if pattern.is_empty() || pattern == "/" {
        prefix.to_string()
    } else if let Some(query) = pattern.strip_prefix("/?") {
        format!("{prefix}?{query}")
    } else if pattern.starts_with('/') || pattern.starts_with('?') {
        format!("{prefix}{pattern}")
    } else {
        return Err(ParseError::MissingLeadingSlash(pattern.to_string()));
    };
    Ok(joined)
}

fn resolve_parts(
    pattern: &RoutePattern,
    registry: &TypeRegistry,
) -> Result<Vec<Part>, CompileError> {
    pattern
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Literal(s) => Ok(Part::Literal(s.clone())),
            Segment::Param(spec) => {
                let descriptor = registry.resolve(&spec.type_name)?;
                Ok(Part::Param {
                    name: spec.name.clone(),
                    fragment: descriptor.fragment,
                    schema: descriptor.schema,
                })
            }
        })
        .collect()
}

fn build_regex(pattern: &str, parts: &[Part]) -> Result<Regex, CompileError> {
    let mut regex_str = String::from("^");

    for part in parts {
        regex_str.push('/');
        match part {
            Part::Literal(s) => regex_str.push_str(&regex::escape(s)),
            Part::Param { name, fragment, .. } => {
                regex_str.push_str(&format!("(?P<{name}>(?:{fragment}))"));
            }
        }
    }

    if parts.is_empty() {
        regex_str.push('/');
    }
    regex_str.push('$');

    Regex::new(&regex_str).map_err(|e| CompileError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
