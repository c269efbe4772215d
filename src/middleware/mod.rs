//! Middleware composition and the bundled middleware.
//!
//! A middleware turns a handler into another handler. The returned handler
//! may run code before `next`, after `next`, or never call `next` at all.
//!
//! Available middleware:
//! - `recover` - panic boundary with opaque correlation ids
//! - `request_id` - request tracing id
//! - `logger` - one log line per request
//! - `cors` - cross-origin headers and preflight
//! - `auth` - bearer token / session cookie authentication
//! - `upload` - multipart validation

pub mod auth;
pub mod cors;
pub mod logger;
pub mod recover;
pub mod request_id;
pub mod upload;

use std::sync::Arc;

use crate::context::Context;

/// A request handler. Cheap to clone; shared by every dispatch of a route.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// A handler transform, `wrap(next) -> handler`.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Boxes a closure as a `Handler`.
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds a middleware from a closure receiving the context and the next
/// handler in the chain.
///
/// ```ignore
/// let timing = from_fn(|ctx, next| {
///     let start = Instant::now();
///     next(ctx);
///     ctx.set("elapsed", start.elapsed());
/// });
/// ```
pub fn from_fn<F>(f: F) -> Middleware
where
    F: Fn(&mut Context, &Handler) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: Handler| -> Handler {
        let f = Arc::clone(&f);
        Arc::new(move |ctx: &mut Context| f(ctx, &next))
    })
}

/// Wraps `handler` so that `chain[0]` is outermost and runs first.
///
/// Used both when a group bakes its middleware into a route at registration
/// and when the router applies its global middleware on every dispatch.
pub fn compose(handler: Handler, chain: &[Middleware]) -> Handler {
    chain.iter().rev().fold(handler, |next, middleware| middleware(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn trace(label: &'static str) -> Middleware {
        from_fn(move |ctx, next| {
            ctx.get_mut::<Vec<String>>("trace").unwrap().push(format!("{label}:before"));
            next(ctx);
            ctx.get_mut::<Vec<String>>("trace").unwrap().push(format!("{label}:after"));
        })
    }

    #[test]
    fn test_outermost_first() {
        let handler = handler_fn(|ctx| {
            ctx.get_mut::<Vec<String>>("trace").unwrap().push("handler".to_string());
        });
        let composed = compose(handler, &[trace("a"), trace("b")]);

        let mut ctx = Context::new(Method::GET, "/");
        ctx.set("trace", Vec::<String>::new());
        composed(&mut ctx);

        assert_eq!(
            ctx.get::<Vec<String>>("trace").unwrap(),
            &["a:before", "b:before", "handler", "b:after", "a:after"]
        );
    }

    #[test]
    fn test_short_circuit() {
        let gate = from_fn(|ctx, _next| ctx.error_forbidden("nope"));
        let composed = compose(handler_fn(|ctx| ctx.respond_ok(&"reached")), &[gate]);

        let mut ctx = Context::new(Method::GET, "/");
        composed(&mut ctx);
        assert_eq!(ctx.status(), Some(http::StatusCode::FORBIDDEN));
        assert_eq!(ctx.response().body_writes(), 1);
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let composed = compose(handler_fn(|ctx| ctx.respond_ok(&1)), &[]);
        let mut ctx = Context::new(Method::GET, "/");
        composed(&mut ctx);
        assert_eq!(ctx.status(), Some(http::StatusCode::OK));
    }
}
