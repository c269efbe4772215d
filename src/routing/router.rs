//! Route tables and request dispatch.
//!
//! # Responsibilities
//! - Store static routes for O(1) lookup and dynamic routes in order
//! - Resolve a request to exactly one handler
//! - Apply router-global middleware at dispatch time
//! - Enumerate registered routes for diagnostics

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use http::{header, Method, Request, Response};
use serde::Serialize;
use tracing::{debug, info};

use super::{
    group::RouteGroup,
    matcher::{is_dynamic, match_pattern, validate_pattern},
};
use crate::{
    context::Context,
    features::static_files,
    middleware::{compose, handler_fn, Handler, Middleware},
};

struct DynamicRoute {
    method: Method,
    pattern: String,
    handler: Handler,
}

/// Registered route as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
}

/// Registration-phase router. Call `freeze` before serving.
pub struct Router {
    static_routes: HashMap<Method, HashMap<String, Handler>>,
    dynamic_routes: Vec<DynamicRoute>,
    middleware: Vec<Middleware>,
    not_found: Handler,
    method_not_allowed: Option<Handler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            static_routes: HashMap::new(),
            dynamic_routes: Vec::new(),
            middleware: Vec::new(),
            not_found: handler_fn(default_not_found),
            method_not_allowed: None,
        }
    }

    /// Registers an already built handler.
    ///
    /// Static paths overwrite an earlier registration of the same
    /// (method, path); dynamic patterns are appended and never replace.
    ///
    /// # Panics
    /// If the pattern has an empty parameter name or a wildcard that is not
    /// the last segment.
    pub fn handle(&mut self, method: Method, path: &str, handler: Handler) -> &mut Self {
        if let Err(reason) = validate_pattern(path) {
            panic!("invalid route {method} {path}: {reason}");
        }

        if is_dynamic(path) {
            debug!(%method, pattern = path, "registered dynamic route");
            self.dynamic_routes.push(DynamicRoute {
                method,
                pattern: path.to_string(),
                handler,
            });
        } else {
            debug!(%method, path, "registered static route");
            if self
                .static_routes
                .entry(method.clone())
                .or_default()
                .insert(path.to_string(), handler)
                .is_some()
            {
                debug!(%method, path, "static route overwritten");
            }
        }
        self
    }

    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.handle(method, path, handler_fn(handler))
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

    /// Adds a global middleware, applied around every handler at dispatch.
    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Starts a group with `prefix` and no middleware of its own.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup::new(prefix.to_string(), self, Vec::new())
    }

    pub fn not_found<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.not_found = handler_fn(handler);
        self
    }

    pub fn method_not_allowed<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.method_not_allowed = Some(handler_fn(handler));
        self
    }

    /// Mounts `dir` as `GET {prefix}/*filepath`.
    pub fn serve_static(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> &mut Self {
        let dir: PathBuf = dir.into();
        let pattern = format!("{}/*{}", prefix.trim_end_matches('/'), static_files::FILEPATH_PARAM);
        info!(prefix, dir = %dir.display(), "mounting static directory");
        self.handle(
            Method::GET,
            &pattern,
            handler_fn(move |ctx| static_files::serve(ctx, &dir)),
        )
    }

    /// Ends the registration phase.
    pub fn freeze(self) -> FrozenRouter {
        FrozenRouter {
            inner: Arc::new(self),
        }
    }

    /// Static routes sorted by (path, method), then dynamic routes in
    /// registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut static_routes: Vec<RouteInfo> = self
            .static_routes
            .iter()
            .flat_map(|(method, paths)| {
                paths.keys().map(move |path| RouteInfo {
                    method: method.to_string(),
                    path: path.clone(),
                })
            })
            .collect();
        static_routes.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));

        static_routes
            .into_iter()
            .chain(self.dynamic_routes.iter().map(|route| RouteInfo {
                method: route.method.to_string(),
                path: route.pattern.clone(),
            }))
            .collect()
    }

    fn dispatch(&self, req: Request<Bytes>) -> Response<Bytes> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        if let Some(handler) = self.static_routes.get(&method).and_then(|routes| routes.get(&path)) {
            return self.run(handler, Context::from_request(req));
        }

        for route in self.dynamic_routes.iter().filter(|route| route.method == method) {
            if let Some(params) = match_pattern(&route.pattern, &path) {
                debug!(%method, path = %path, pattern = %route.pattern, "dynamic route matched");
                return self.run(&route.handler, Context::from_request(req).with_params(params));
            }
        }

        if let Some(handler) = &self.method_not_allowed {
            let allowed = self.static_methods_for(&path);
            if !allowed.is_empty() {
                let mut ctx = Context::from_request(req);
                ctx.set_header(header::ALLOW, &allowed.join(", "));
                return self.run(handler, ctx);
            }
        }

        debug!(%method, path = %path, "no route matched");
        self.run(&self.not_found, Context::from_request(req))
    }

    /// Methods under which `path` is registered in the static table.
    /// Dynamic routes are not consulted.
    fn static_methods_for(&self, path: &str) -> Vec<String> {
        let mut methods: Vec<String> = self
            .static_routes
            .iter()
            .filter(|(_, routes)| routes.contains_key(path))
            .map(|(method, _)| method.to_string())
            .collect();
        methods.sort();
        methods
    }

    fn run(&self, handler: &Handler, mut ctx: Context) -> Response<Bytes> {
        let composed = compose(Arc::clone(handler), &self.middleware);
        composed(&mut ctx);
        ctx.into_response()
    }
}

fn default_not_found(ctx: &mut Context) {
    ctx.error_not_found("404 page not found");
}

/// Read-only router produced by `Router::freeze`. Clones share the tables.
#[derive(Clone)]
pub struct FrozenRouter {
    inner: Arc<Router>,
}

impl FrozenRouter {
    /// Resolves `req` and runs the composed handler on a fresh `Context`.
    pub fn dispatch(&self, req: Request<Bytes>) -> Response<Bytes> {
        self.inner.dispatch(req)
    }

    pub fn routes(&self) -> Vec<RouteInfo> {
        self.inner.routes()
    }

    pub fn log_routes(&self) {
        for route in self.routes() {
            info!(method = %route.method, path = %route.path, "registered route");
        }
    }

    pub fn routes_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.routes())
    }

    /// Writes the route list as pretty JSON to `path`.
    pub fn export_routes(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = self.routes_json()?;
        fs::write(path.as_ref(), json)?;
        info!(path = %path.as_ref().display(), "exported routes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn request(method: Method, path: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_static_overwrite_dynamic_append() {
        let mut router = Router::new();
        router.get("/a", |ctx| ctx.respond_ok(&1));
        router.get("/a", |ctx| ctx.respond_ok(&2));
        router.get("/b/:id", |ctx| ctx.respond_ok(&1));
        router.get("/b/:id", |ctx| ctx.respond_ok(&2));

        let routes = router.routes();
        assert_eq!(routes.len(), 3);

        let frozen = router.freeze();
        let res = frozen.dispatch(request(Method::GET, "/a"));
        assert_eq!(res.body().as_ref(), b"2\n");
        let res = frozen.dispatch(request(Method::GET, "/b/9"));
        assert_eq!(res.body().as_ref(), b"1\n");
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let mut router = Router::new();
        router.get("/items", |ctx| ctx.respond_ok(&"list"));
        router.post("/items", |ctx| ctx.respond_created(&"made"));
        router.method_not_allowed(|ctx| ctx.error_method_not_allowed("method not allowed"));
        let frozen = router.freeze();

        let res = frozen.dispatch(request(Method::DELETE, "/items"));
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[header::ALLOW], "GET, POST");
    }

    #[test]
    fn test_method_not_allowed_ignores_dynamic_routes() {
        let mut router = Router::new();
        router.get("/items/:id", |ctx| ctx.respond_ok(&"one"));
        router.method_not_allowed(|ctx| ctx.error_method_not_allowed("method not allowed"));
        let frozen = router.freeze();

        let res = frozen.dispatch(request(Method::DELETE, "/items/3"));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_method_not_allowed_without_handler_falls_through() {
        let mut router = Router::new();
        router.get("/items", |ctx| ctx.respond_ok(&"list"));
        let frozen = router.freeze();

        let res = frozen.dispatch(request(Method::PUT, "/items"));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body().as_ref(), b"{\"error\":\"404 page not found\"}\n");
    }

    #[test]
    #[should_panic(expected = "wildcard must be the last segment")]
    fn test_invalid_pattern_panics() {
        let mut router = Router::new();
        router.get("/files/*path/meta", |ctx| ctx.respond_ok(&()));
    }

    #[test]
    fn test_routes_listing_order() {
        let mut router = Router::new();
        router.get("/z/:id", |_| {});
        router.post("/b", |_| {});
        router.get("/b", |_| {});
        router.get("/a", |_| {});
        router.delete("/a/:id", |_| {});

        let listed: Vec<(String, String)> = router
            .routes()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("GET".to_string(), "/a".to_string()),
                ("GET".to_string(), "/b".to_string()),
                ("POST".to_string(), "/b".to_string()),
                ("GET".to_string(), "/z/:id".to_string()),
                ("DELETE".to_string(), "/a/:id".to_string()),
            ]
        );
    }
}
