//! Parameter type registry.
//!
//! Maps a type name used in patterns (`:id(number)`) to the schema that
//! validates it and the regex fragment that matches its text in a path.
//!
//! A [`TypeRegistry`] is a shared handle: clones see the same vocabulary.
//! Readers take a snapshot, so compiled routes keep the descriptors that were
//! current when they were compiled, and registering a type later has no
//! effect on them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use crate::error::CompileError;
use crate::schema::{self, SchemaRef};

/// Fragment for `string`: any run of characters except `/`, `&` and `?`.
pub const STRING_FRAGMENT: &str = r"[^/&?]+";
/// Fragment for `number`: optional sign, digits, optional decimal part.
pub const NUMBER_FRAGMENT: &str = r"[-+]?[0-9]+(?:\.[0-9]+)?";
/// Fragment for `boolean`.
pub const BOOLEAN_FRAGMENT: &str = r"true|false|0|1";

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// A registered parameter type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Validates and coerces values of this type.
    pub schema: SchemaRef,
    /// Regex fragment matching the textual form of this type.
    pub fragment: String,
}

impl TypeDescriptor {
    /// Creates a new descriptor.
    pub fn new(schema: SchemaRef, fragment: impl Into<String>) -> Self {
        Self {
            schema,
            fragment: fragment.into(),
        }
    }
}

type Types = HashMap<String, TypeDescriptor>;

/// Extensible mapping from type name to [`TypeDescriptor`].
#[derive(Clone)]
pub struct TypeRegistry {
    types: Arc<ArcSwap<Types>>,
}

impl TypeRegistry {
    /// Creates an isolated registry seeded with `string`, `number` and
    /// `boolean`.
    pub fn new() -> Self {
        let types: Types = [
            ("string", TypeDescriptor::new(schema::string(), STRING_FRAGMENT)),
            ("number", TypeDescriptor::new(schema::number(), NUMBER_FRAGMENT)),
            (
                "boolean",
                TypeDescriptor::new(schema::boolean(), BOOLEAN_FRAGMENT),
            ),
        ]
        .into_iter()
        .map(|(name, descriptor)| (name.to_string(), descriptor))
        .collect();

        Self {
            types: Arc::new(ArcSwap::from_pointee(types)),
        }
    }

    /// Returns the process-wide registry used by [`Router::new`](crate::Router::new).
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Registers a type, replacing any existing entry with the same name.
    ///
    /// The fragment must be a valid regex; an invalid fragment is reported
    /// when a pattern using the type is compiled.
    ///
    /// # Example
    ///
    /// ```
    /// use boiling_router::{schema, TypeRegistry};
    ///
    /// let registry = TypeRegistry::new();
    /// registry.register(
    ///     "uid",
    ///     schema::union([schema::number(), schema::literal("@me")]),
    ///     r"@me|[-+]?[0-9]+(?:\.[0-9]+)?",
    /// );
    /// assert!(registry.contains("uid"));
    /// ```
    pub fn register(
        &self,
        name: impl Into<String>,
        schema: SchemaRef,
        fragment: impl Into<String>,
    ) {
        let name = name.into();
        let descriptor = TypeDescriptor::new(schema, fragment);
        tracing::debug!(
            name = %name,
            fragment = %descriptor.fragment,
            "Registering parameter type"
        );

        self.types.rcu(|current| {
            let mut next = Types::clone(current);
            next.insert(name.clone(), descriptor.clone());
            next
        });
    }

    /// Looks up a type by name.
    pub fn resolve(&self, name: &str) -> Result<TypeDescriptor, CompileError> {
        self.types
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownType(name.to_string()))
    }

    /// Returns whether a type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.load().contains_key(name)
    }

    /// Returns the registered type names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.load().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
