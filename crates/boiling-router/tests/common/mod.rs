#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use boiling_router::{
    CompiledRoute, Context, MatchResult, Result, Router, RouterError, RouterOptions,
    TypeRegistry, ValidationError,
};
use serde_json::{json, Value};

/// A router with its own registry, so tests do not share types.
pub fn router(prefix: Option<&str>, registry: &TypeRegistry) -> Router {
    let options = RouterOptions {
        prefix: prefix.map(str::to_string),
    };
    Router::with_options(options, registry.clone())
}

pub fn compile(pattern: &str, registry: &TypeRegistry) -> CompiledRoute {
    CompiledRoute::new(pattern, registry)
        .unwrap_or_else(|e| panic!("Failed to compile: {pattern}\nError: {e}"))
}

pub fn resolve(target: &str, route: &CompiledRoute) -> MatchResult {
    boiling_router::resolve_source(target, None, route)
        .unwrap_or_else(|e| panic!("Validation failed for {target}: {e}"))
        .unwrap_or_else(|| panic!("Expected {target} to match {}", route.pattern()))
}

/// Counts how often the rest of the chain runs.
#[derive(Clone, Default)]
pub struct NextCounter {
    calls: Arc<AtomicUsize>,
}

impl NextCounter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn next(&self) -> impl FnOnce(Context) -> std::future::Ready<Result<Value>> {
        let calls = Arc::clone(&self.calls);
        move |ctx: Context| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(json!({ "next": ctx.path })))
        }
    }
}

pub async fn dispatch(router: &Router, ctx: Context) -> Value {
    router
        .dispatch(ctx, |_| async { Ok(json!("next")) })
        .await
        .unwrap_or_else(|e| panic!("Dispatch failed: {e}"))
}

pub async fn dispatch_err(router: &Router, ctx: Context) -> ValidationError {
    match router.dispatch(ctx, |_| async { Ok(json!("next")) }).await {
        Err(RouterError::Validation(err)) => err,
        other => panic!("Expected validation error, got {other:?}"),
    }
}
