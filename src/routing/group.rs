//! Route groups: a path prefix plus middleware baked into each route.

use std::path::PathBuf;

use http::Method;

use super::router::Router;
use crate::{
    context::Context,
    middleware::{compose, handler_fn, Middleware},
};

/// Borrowing view over a `Router` that prefixes paths and wraps handlers.
///
/// The middleware list is owned by the group. Sub-groups start from a copy,
/// and routes capture the list as it is when they are registered.
pub struct RouteGroup<'r> {
    prefix: String,
    router: &'r mut Router,
    middleware: Vec<Middleware>,
}

impl<'r> RouteGroup<'r> {
    pub(crate) fn new(prefix: String, router: &'r mut Router, middleware: Vec<Middleware>) -> Self {
        Self {
            prefix,
            router,
            middleware,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Registers `prefix + path` with the group's current middleware
    /// composed around `handler`.
    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        let handler = compose(handler_fn(handler), &self.middleware);
        let full_path = format!("{}{}", self.prefix, path);
        self.router.handle(method, &full_path, handler);
        self
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Nested group; copies this group's middleware at creation.
    pub fn group(&mut self, sub_path: &str) -> RouteGroup<'_> {
        RouteGroup::new(
            format!("{}{}", self.prefix, sub_path),
            &mut *self.router,
            self.middleware.clone(),
        )
    }

    /// Mounts `dir` under `prefix + path`. Group middleware does not apply.
    pub fn serve_static(&mut self, path: &str, dir: impl Into<PathBuf>) -> &mut Self {
        let full_path = format!("{}{}", self.prefix, path);
        self.router.serve_static(&full_path, dir);
        self
    }
}
