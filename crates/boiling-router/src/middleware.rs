//! Middleware chain support.
//!
//! A [`Middleware`] receives the request [`Context`] and a [`Next`]
//! continuation. It can answer the request itself, pass it on unchanged, or
//! wrap what the rest of the chain returns. [`Router`](crate::Router) is a
//! middleware: it answers requests that match one of its routes and passes
//! the others on.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::context::Context;
use crate::error::Result;

/// A boxed future for async middleware operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remainder of a middleware chain.
pub type Next<'a, T> = Box<dyn FnOnce(Context) -> BoxFuture<'a, Result<T>> + Send + 'a>;

/// Terminal handler of a [`Stack`], called when every middleware passed.
pub type Fallback<T> = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Trait for middleware that takes part in request dispatch.
///
/// # Example
///
/// ```ignore
/// struct Deny;
///
/// impl Middleware<Value> for Deny {
///     fn call<'a>(&'a self, ctx: Context, next: Next<'a, Value>) -> BoxFuture<'a, Result<Value>> {
///         Box::pin(async move {
///             if ctx.path.starts_with("/admin") {
///                 return Ok(json!("denied"));
///             }
///             next(ctx).await
///         })
///     }
/// }
/// ```
pub trait Middleware<T>: Send + Sync {
    /// Handles a request, calling `next` to continue the chain.
    fn call<'a>(&'a self, ctx: Context, next: Next<'a, T>) -> BoxFuture<'a, Result<T>>;
}

/// An ordered chain of middleware ending in a fallback.
pub struct Stack<T> {
    layers: Vec<Arc<dyn Middleware<T>>>,
    fallback: Fallback<T>,
}

impl<T: Send + 'static> Stack<T> {
    /// Creates a stack that ends in `fallback`.
    pub fn new<F, Fut>(fallback: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            layers: Vec::new(),
            fallback: Arc::new(move |ctx: Context| fallback(ctx).boxed()),
        }
    }

    /// Appends a middleware; earlier layers run first.
    #[must_use]
    pub fn layer(mut self, middleware: impl Middleware<T> + 'static) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends a shared middleware.
    #[must_use]
    pub fn layer_arc(mut self, middleware: Arc<dyn Middleware<T>>) -> Self {
        self.layers.push(middleware);
        self
    }

    /// Runs a request through the chain.
    pub fn handle(&self, ctx: Context) -> BoxFuture<'_, Result<T>> {
        self.run(0, ctx)
    }

    fn run(&self, index: usize, ctx: Context) -> BoxFuture<'_, Result<T>> {
        match self.layers.get(index) {
            Some(layer) => layer.call(ctx, Box::new(move |ctx| self.run(index + 1, ctx))),
            None => (self.fallback)(ctx),
        }
    }
}

/// Middleware that records requests with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceMiddleware;

impl<T: Send + 'static> Middleware<T> for TraceMiddleware {
    fn call<'a>(&'a self, ctx: Context, next: Next<'a, T>) -> BoxFuture<'a, Result<T>> {
        Box::pin(async move {
            let method = ctx.method;
            let path = ctx.path.clone();
            debug!(%method, %path, "--> request");

            let result = next(ctx).await;
            match &result {
                Ok(_) => debug!(%method, %path, "<-- ok"),
                Err(err) => debug!(%method, %path, error = %err, "<-- error"),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tag(&'static str);

    impl Middleware<Value> for Tag {
        fn call<'a>(&'a self, ctx: Context, next: Next<'a, Value>) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                let inner = next(ctx).await?;
                Ok(json!(format!("{}({})", self.0, inner.as_str().unwrap_or_default())))
            })
        }
    }

    struct ShortCircuit;

    impl Middleware<Value> for ShortCircuit {
        fn call<'a>(&'a self, ctx: Context, next: Next<'a, Value>) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                if ctx.path == "/stop" {
                    return Ok(json!("stopped"));
                }
                next(ctx).await
            })
        }
    }

    #[tokio::test]
    async fn test_layers_run_in_order() {
        let stack = Stack::new(|_| async { Ok(json!("end")) })
            .layer(Tag("a"))
            .layer(TraceMiddleware)
            .layer(Tag("b"));

        let result = stack.handle(Context::get("/")).await.unwrap();
        assert_eq!(result, json!("a(b(end))"));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stack = Stack::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!("end")) }
        })
        .layer(ShortCircuit);

        assert_eq!(stack.handle(Context::get("/stop")).await.unwrap(), json!("stopped"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(stack.handle(Context::get("/go")).await.unwrap(), json!("end"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
