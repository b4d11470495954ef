//! # boiling-router
//!
//! A typed URL router with middleware support.
//!
//! This crate provides:
//! - Route patterns with typed path parameters and optional query parameters
//! - An extensible registry of parameter types
//! - Validation and coercion of extracted values before handlers run
//! - First-match dispatch with fall-through to the next middleware
//! - Router prefixes and nesting
//!
//! ## Quick Start
//!
//! ```
//! use boiling_router::{Context, Router};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new()
//!     .get("/foo/:foo(number)", |ctx: Context| async move {
//!         Ok(json!({ "foo": ctx.params.get("foo") }))
//!     })?;
//!
//! let found = router
//!     .dispatch(Context::get("/foo/123"), |_| async { Ok(json!("fallthrough")) })
//!     .await?;
//! assert_eq!(found, json!({ "foo": 123 }));
//!
//! // `abc` does not have the shape of a number, so the route does not match.
//! let missed = router
//!     .dispatch(Context::get("/foo/abc"), |_| async { Ok(json!("fallthrough")) })
//!     .await?;
//! assert_eq!(missed, json!("fallthrough"));
//! # Ok::<(), boiling_router::RouterError>(())
//! # }).unwrap();
//! ```
//!
//! ## Pattern Syntax
//!
//! ```text
//! /users/:id(number)/posts/:slug?page(number)&sort
//! ```
//!
//! - `:name` declares a path parameter of type `string`
//! - `:name(type)` declares a path parameter of a registered type
//! - `?a&b(type)` declares optional query parameters
//!
//! Built-in types are `string`, `number` and `boolean`.
//!
//! ## Custom Types
//!
//! ```
//! use boiling_router::{schema, Router, RouterOptions, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! registry.register(
//!     "uid",
//!     schema::union([schema::number(), schema::literal("@me")]),
//!     r"@me|[-+]?[0-9]+(?:\.[0-9]+)?",
//! );
//!
//! let router: Router = Router::with_options(RouterOptions::default(), registry)
//!     .get("/users/:id(uid)", |ctx| async move {
//!         Ok(ctx.params.get("id").cloned().unwrap_or_default())
//!     })
//!     .unwrap();
//! assert_eq!(router.routes().len(), 1);
//! ```
//!
//! ## Middleware
//!
//! ```ignore
//! use boiling_router::{Stack, TraceMiddleware};
//!
//! let stack = Stack::new(not_found)
//!     .layer(TraceMiddleware)
//!     .layer(users_router)
//!     .layer(messages_router);
//!
//! let response = stack.handle(ctx).await?;
//! ```

mod compile;
mod context;
mod error;
mod middleware;
mod pattern;
mod registry;
mod resolve;
mod router;
pub mod schema;

pub use compile::{compile, CompiledRoute};
pub use context::{Context, Method, UnknownMethod, Values};
pub use error::{
    BoxError, CompileError, Location, ParseError, Result, RouterError, ValidationError,
};
pub use middleware::{BoxFuture, Fallback, Middleware, Next, Stack, TraceMiddleware};
pub use pattern::{ParamSpec, RoutePattern, Segment, DEFAULT_TYPE};
pub use registry::{
    TypeDescriptor, TypeRegistry, BOOLEAN_FRAGMENT, NUMBER_FRAGMENT, STRING_FRAGMENT,
};
pub use resolve::{parse_query_string, resolve_source, MatchResult};
pub use router::{Handler, Route, RouteDef, Router, RouterOptions};
pub use schema::{Schema, SchemaError, SchemaRef};
