//! Per-request state threaded through the middleware chain.
//!
//! A `Context` is built by the router for exactly one dispatch and dropped
//! when the response leaves. It carries:
//! - an immutable snapshot of the request line (method, path, query),
//! - the request headers and the fully buffered body,
//! - the parameters captured by the matched dynamic route,
//! - a typed key/value store for middleware-to-handler communication,
//! - the response being built, whose status can be written only once.

pub mod response;
pub mod upload;

use std::{any::Any, collections::HashMap, fmt};

use bytes::Bytes;
use http::{header, HeaderMap, Method, Request};
use serde::de::DeserializeOwned;

use crate::{constants::data_keys, errors::AppError};

pub use response::ResponseWriter;
pub use upload::UploadedFile;

type DataValue = Box<dyn Any + Send + Sync>;

pub struct Context {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    data: HashMap<String, DataValue>,
    response: ResponseWriter,
}

impl Context {
    /// Creates an empty context for a bodiless request. Mostly useful in tests.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            data: HashMap::new(),
            response: ResponseWriter::default(),
        }
    }

    pub fn from_request(req: Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_owned),
            method: parts.method,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            data: HashMap::new(),
            response: ResponseWriter::default(),
        }
    }

    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    // ----- request snapshot -----

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the header value if present and valid visible ASCII.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Looks up a cookie by name across all `Cookie` headers.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decodes the request body as JSON. Decode failures come back as
    /// `AppError::InvalidBody` and never panic.
    pub fn bind_json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_slice(&self.body).map_err(AppError::from)
    }

    // ----- route parameters -----

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    // ----- data store -----

    /// Stores a value under `key`, replacing any previous value.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), Box::new(value));
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.data.get_mut(key).and_then(|value| value.downcast_mut::<T>())
    }

    /// Removes and returns the value under `key`. A value of another type is
    /// left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.data.get(key).is_some_and(|value| value.is::<T>()) {
            return None;
        }
        self.data
            .remove(key)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Request id stored by `middleware::request_id`, if that middleware ran.
    pub fn request_id(&self) -> Option<&str> {
        self.get::<String>(data_keys::REQUEST_ID).map(String::as_str)
    }

    // ----- response -----

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn into_response(self) -> http::Response<Bytes> {
        self.response.into_response()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("data_keys", &keys)
            .field("status", &self.response.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_request_snapshots_request_line() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/products/42?verbose=1")
            .header("cookie", "theme=dark; auth_token=abc123")
            .body(Bytes::from_static(b"{\"name\":\"lamp\"}"))
            .unwrap();
        let ctx = Context::from_request(req);

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/products/42");
        assert_eq!(ctx.query(), Some("verbose=1"));
        assert_eq!(ctx.cookie("auth_token"), Some("abc123"));
        assert_eq!(ctx.cookie("missing"), None);
        assert!(ctx.params().is_empty());
        assert_eq!(ctx.response().status(), None);
    }

    #[test]
    fn data_store_is_typed() {
        let mut ctx = Context::new(Method::GET, "/");
        ctx.set("count", 3_u32);
        ctx.set("name", "alice".to_string());

        assert_eq!(ctx.get::<u32>("count"), Some(&3));
        assert_eq!(ctx.get::<String>("count"), None);
        *ctx.get_mut::<u32>("count").unwrap() += 1;
        assert_eq!(ctx.remove::<String>("count"), None);
        assert_eq!(ctx.remove::<u32>("count"), Some(4));
        assert!(!ctx.contains("count"));
        assert!(ctx.contains("name"));
    }

    #[test]
    fn bind_json_surfaces_decode_errors() {
        #[derive(serde::Deserialize)]
        struct Product {
            name: String,
        }

        let req = Request::builder()
            .method(Method::POST)
            .uri("/products")
            .body(Bytes::from_static(b"{\"name\": 5}"))
            .unwrap();
        let ctx = Context::from_request(req);
        let result = ctx.bind_json::<Product>();
        assert!(matches!(result, Err(AppError::InvalidBody(_))));

        let ok = Context::from_request(
            Request::builder()
                .uri("/products")
                .body(Bytes::from_static(b"{\"name\": \"lamp\"}"))
                .unwrap(),
        );
        assert_eq!(ok.bind_json::<Product>().unwrap().name, "lamp");
    }
}
