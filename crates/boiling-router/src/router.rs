//! Main router implementation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::compile::{join_prefix, CompiledRoute};
use crate::context::{Context, Method};
use crate::error::{Location, Result, ValidationError};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::registry::TypeRegistry;
use crate::resolve::resolve_source;
use crate::schema::SchemaRef;

/// A boxed async handler function.
pub type Handler<T> = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Router configuration.
///
/// Deserializable so hosts can embed it in their own config files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Literal prepended to every pattern registered on the router.
    pub prefix: Option<String>,
}

/// Everything about a route except its handler.
///
/// # Example
///
/// ```
/// use boiling_router::{schema, RouteDef};
///
/// let def = RouteDef::get("/users/:id")
///     .response(schema::string())
///     .params([schema::number()]);
/// assert_eq!(def.pattern(), "/users/:id");
/// ```
#[derive(Debug, Clone)]
pub struct RouteDef {
    method: Method,
    pattern: String,
    response: Option<SchemaRef>,
    params: Option<Vec<SchemaRef>>,
    body: Option<SchemaRef>,
}

impl RouteDef {
    /// Creates a route definition.
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            response: None,
            params: None,
            body: None,
        }
    }

    /// Creates a GET route definition.
    pub fn get(pattern: impl Into<String>) -> Self {
        Self::new(Method::Get, pattern)
    }

    /// Creates a POST route definition.
    pub fn post(pattern: impl Into<String>) -> Self {
        Self::new(Method::Post, pattern)
    }

    /// Creates a PUT route definition.
    pub fn put(pattern: impl Into<String>) -> Self {
        Self::new(Method::Put, pattern)
    }

    /// Creates a PATCH route definition.
    pub fn patch(pattern: impl Into<String>) -> Self {
        Self::new(Method::Patch, pattern)
    }

    /// Creates a DELETE route definition.
    pub fn delete(pattern: impl Into<String>) -> Self {
        Self::new(Method::Delete, pattern)
    }

    /// Documents the response schema. It is not checked against handler
    /// output.
    #[must_use]
    pub fn response(mut self, schema: SchemaRef) -> Self {
        self.response = Some(schema);
        self
    }

    /// Overrides path parameter schemas by position. There must be exactly
    /// one schema per path parameter.
    #[must_use]
    pub fn params(mut self, schemas: impl IntoIterator<Item = SchemaRef>) -> Self {
        self.params = Some(schemas.into_iter().collect());
        self
    }

    /// Validates the request body with `schema` before the handler runs.
    #[must_use]
    pub fn body(mut self, schema: SchemaRef) -> Self {
        self.body = Some(schema);
        self
    }

    /// Returns the method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the pattern, without any router prefix.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// A registered route.
pub struct Route<T> {
    method: Method,
    compiled: CompiledRoute,
    response: Option<SchemaRef>,
    body: Option<SchemaRef>,
    handler: Handler<T>,
}

impl<T> Route<T> {
    /// Returns the HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the full pattern, including prefixes.
    pub fn pattern(&self) -> &str {
        self.compiled.pattern()
    }

    /// Returns the compiled matcher.
    pub fn compiled(&self) -> &CompiledRoute {
        &self.compiled
    }

    /// Returns the documented response schema.
    pub fn response_schema(&self) -> Option<&SchemaRef> {
        self.response.as_ref()
    }

    /// Returns the request body schema.
    pub fn body_schema(&self) -> Option<&SchemaRef> {
        self.body.as_ref()
    }
}

impl<T> Clone for Route<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            compiled: self.compiled.clone(),
            response: self.response.clone(),
            body: self.body.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<T> fmt::Debug for Route<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern())
            .finish_non_exhaustive()
    }
}

/// A typed router.
///
/// Routes are tried in registration order; the first one whose method and
/// path match handles the request. Registration takes `self` or `&mut self`,
/// so a router shared between tasks (for example behind an `Arc`) is
/// read-only.
///
/// # Example
///
/// ```
/// use boiling_router::{Context, Router};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let router = Router::with_prefix("/users")
///     .get("/:id(number)", |ctx: Context| async move {
///         Ok(json!(ctx.params.get_i64("id")))
///     })
///     .unwrap();
///
/// let found = router
///     .dispatch(Context::get("/users/42"), |_| async { Ok(json!(null)) })
///     .await
///     .unwrap();
/// assert_eq!(found, json!(42));
/// # });
/// ```
pub struct Router<T = Value> {
    prefix: String,
    registry: TypeRegistry,
    routes: Vec<Route<T>>,
}

impl Router {
    /// Creates an empty router using the global type registry.
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default(), TypeRegistry::global())
    }

    /// Creates an empty router whose patterns all start with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let options = RouterOptions {
            prefix: Some(prefix.into()),
        };
        Self::with_options(options, TypeRegistry::global())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Router<T> {
    /// Creates an empty router with explicit options and type registry.
    pub fn with_options(options: RouterOptions, registry: TypeRegistry) -> Self {
        Self {
            prefix: options.prefix.unwrap_or_default(),
            registry,
            routes: Vec::new(),
        }
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the type registry patterns are compiled against.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Returns the registered routes in priority order.
    pub fn routes(&self) -> &[Route<T>] {
        &self.routes
    }

    /// Adds a GET route.
    pub fn get<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Get, pattern), handler)
    }

    /// Adds a POST route.
    pub fn post<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Post, pattern), handler)
    }

    /// Adds a PUT route.
    pub fn put<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Put, pattern), handler)
    }

    /// Adds a PATCH route.
    pub fn patch<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Patch, pattern), handler)
    }

    /// Adds a DELETE route.
    pub fn delete<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Delete, pattern), handler)
    }

    /// Adds a HEAD route.
    pub fn head<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Head, pattern), handler)
    }

    /// Adds an OPTIONS route.
    pub fn options<F, Fut>(self, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.route(RouteDef::new(Method::Options, pattern), handler)
    }

    /// Adds a route from a full definition.
    pub fn route<F, Fut>(mut self, def: RouteDef, handler: F) -> Result<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let handler: Handler<T> = Arc::new(move |ctx: Context| handler(ctx).boxed());
        self.add_route(def, handler)?;
        Ok(self)
    }

    /// Adds a route to an existing router. It is tried after every route
    /// registered before it.
    ///
    /// Fails if the pattern, prefixed with the router prefix, does not parse
    /// or references an unknown type.
    pub fn add_route(&mut self, def: RouteDef, handler: Handler<T>) -> Result<()> {
        let pattern = join_prefix(&self.prefix, &def.pattern)?;
        let mut compiled = CompiledRoute::new(&pattern, &self.registry)?;
        if let Some(schemas) = def.params {
            compiled.override_params(schemas)?;
        }

        debug!(method = %def.method, pattern = %pattern, "Registered route");
        self.routes.push(Route {
            method: def.method,
            compiled,
            response: def.response,
            body: def.body,
            handler,
        });
        Ok(())
    }

    /// Moves every route of `child` into this router, after the existing
    /// ones, prefixed with this router's prefix.
    pub fn nest(mut self, child: Router<T>) -> Result<Self> {
        for route in child.routes {
            let compiled = route.compiled.prefixed(&self.prefix, &self.registry)?;
            debug!(
                method = %route.method,
                pattern = %compiled.pattern(),
                "Nested route"
            );
            self.routes.push(Route { compiled, ..route });
        }
        Ok(self)
    }

    /// Dispatches a request.
    ///
    /// The first route with the request's method whose pattern matches runs,
    /// with `ctx.params` and `ctx.query` filled in, and its result is
    /// returned. A matching path whose values fail validation is an error;
    /// later routes are not tried. If nothing matches, `next` is called with
    /// the unchanged context.
    pub async fn dispatch<N, Fut>(&self, mut ctx: Context, next: N) -> Result<T>
    where
        N: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let method = ctx.method;

        for route in self.routes.iter().filter(|route| route.method == method) {
            let matched = resolve_source(&ctx.path, ctx.raw_query.as_deref(), &route.compiled)?;
            let Some(matched) = matched else {
                trace!(pattern = %route.pattern(), path = %ctx.path, "Route did not match");
                continue;
            };

            ctx.params = matched.params;
            ctx.query = matched.query;
            if let Some(schema) = &route.body {
                ctx.body = schema
                    .validate(&ctx.body)
                    .map_err(|e| ValidationError::new(Location::Body, "body", e))?;
            }

            debug!(%method, pattern = %route.pattern(), path = %ctx.path, "Matched route");
            return (route.handler)(ctx).await;
        }

        trace!(%method, path = %ctx.path, "No route matched, passing to next");
        next(ctx).await
    }
}

impl<T: Send + 'static> Middleware<T> for Router<T> {
    fn call<'a>(&'a self, ctx: Context, next: Next<'a, T>) -> BoxFuture<'a, Result<T>> {
        self.dispatch(ctx, next).boxed()
    }
}

impl<T> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}
