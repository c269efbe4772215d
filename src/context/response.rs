//! Response building on top of `Context`.
//!
//! Every handler response goes through `Context::json`. The first call
//! writes the status and locks the header; later calls only append body.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use tracing::{debug, error, warn};

use super::Context;
use crate::{constants::headers::APPLICATION_JSON, errors::{AppError, ErrorBody}, utils::correlation_id};

/// Buffered response. `status` is the only record of the response status.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    body_writes: usize,
}

impl ResponseWriter {
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// True once a status has been written; headers are frozen from then on.
    pub fn is_finalized(&self) -> bool {
        self.status.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of body writes performed, including ones after finalization.
    pub fn body_writes(&self) -> usize {
        self.body_writes
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.is_finalized() {
            debug!(header = %name, "header ignored, response already finalized");
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.is_finalized() {
            debug!(header = %name, "header ignored, response already finalized");
            return false;
        }
        self.headers.append(name, value);
        true
    }

    fn write_header(&mut self, status: StatusCode) -> bool {
        if let Some(current) = self.status {
            debug!(
                current = current.as_u16(),
                attempted = status.as_u16(),
                "superfluous status write skipped"
            );
            return false;
        }
        self.status = Some(status);
        true
    }

    fn write_body(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
        self.body_writes += 1;
    }

    pub fn into_response(self) -> http::Response<Bytes> {
        let status = self.status.unwrap_or(StatusCode::OK);
        let body = if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
            Bytes::new()
        } else {
            self.body.freeze()
        };

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Context {
    /// Current response status, `None` until something writes one.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.status()
    }

    /// Writes the status without a body. No-op if a status is already set.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        self.response.write_header(status)
    }

    /// Sets a response header. Ignored once the response is finalized.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => self.response.insert_header(name, value),
            Err(_) => {
                warn!(header = %name, "invalid header value dropped");
                false
            }
        }
    }

    /// Appends a response header, for repeatable headers like `Set-Cookie`.
    pub fn append_header(&mut self, name: HeaderName, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => self.response.append_header(name, value),
            Err(_) => {
                warn!(header = %name, "invalid header value dropped");
                false
            }
        }
    }

    /// Serializes `value` as the response body with `Content-Type:
    /// application/json`. Only the first call sets the status.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        self.response
            .insert_header(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.response.write_header(status);

        match serde_json::to_vec(value) {
            Ok(mut encoded) => {
                encoded.push(b'\n');
                self.response.write_body(&encoded);
            }
            Err(err) => error!(method = %self.method, path = %self.path, error = %err, "failed to encode response body"),
        }
    }

    /// Writes the `{"error": message}` envelope.
    pub fn error(&mut self, status: StatusCode, message: impl Into<String>) {
        self.json(status, &ErrorBody::new(message));
    }

    pub fn abort(&mut self, err: AppError) {
        debug!(method = %self.method, path = %self.path, error = %err, "request aborted");
        self.error(err.status_code(), err.client_message());
    }

    /// Logs `err` with a fresh correlation id and answers with a body that
    /// only exposes the id.
    pub fn abort_with_error(&mut self, status: StatusCode, err: impl Display) {
        let error_id = correlation_id();
        error!(error_id = %error_id, method = %self.method, path = %self.path, error = %err, "request failed");
        self.error(status, format!("Something went wrong. Error ID: {error_id}"));
    }

    /// Raw body write used by the static file primitive.
    pub fn write_bytes(&mut self, status: StatusCode, content_type: &str, bytes: &[u8]) {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.response.insert_header(header::CONTENT_TYPE, value);
        }
        self.response.write_header(status);
        self.response.write_body(bytes);
    }
}

macro_rules! respond_helpers {
    ($($name:ident => $status:ident),* $(,)?) => {
        impl Context {
            $(
                #[doc = concat!("Responds with `", stringify!($status), "` and `value` as JSON.")]
                pub fn $name<T: Serialize + ?Sized>(&mut self, value: &T) {
                    self.json(StatusCode::$status, value);
                }
            )*
        }
    };
}

macro_rules! error_helpers {
    ($($name:ident => $status:ident),* $(,)?) => {
        impl Context {
            $(
                #[doc = concat!("Responds with `", stringify!($status), "` and the error envelope.")]
                pub fn $name(&mut self, message: impl Into<String>) {
                    self.error(StatusCode::$status, message);
                }
            )*
        }
    };
}

respond_helpers! {
    respond_ok => OK,
    respond_created => CREATED,
    respond_accepted => ACCEPTED,
    respond_non_authoritative_info => NON_AUTHORITATIVE_INFORMATION,
    respond_no_content => NO_CONTENT,
    respond_reset_content => RESET_CONTENT,
    respond_partial_content => PARTIAL_CONTENT,
    respond_multi_status => MULTI_STATUS,
    respond_already_reported => ALREADY_REPORTED,
    respond_im_used => IM_USED,
    respond_multiple_choices => MULTIPLE_CHOICES,
    respond_moved_permanently => MOVED_PERMANENTLY,
    respond_found => FOUND,
    respond_see_other => SEE_OTHER,
    respond_not_modified => NOT_MODIFIED,
    respond_temporary_redirect => TEMPORARY_REDIRECT,
    respond_permanent_redirect => PERMANENT_REDIRECT,
}

error_helpers! {
    error_bad_request => BAD_REQUEST,
    error_unauthorized => UNAUTHORIZED,
    error_payment_required => PAYMENT_REQUIRED,
    error_forbidden => FORBIDDEN,
    error_not_found => NOT_FOUND,
    error_method_not_allowed => METHOD_NOT_ALLOWED,
    error_not_acceptable => NOT_ACCEPTABLE,
    error_request_timeout => REQUEST_TIMEOUT,
    error_conflict => CONFLICT,
    error_gone => GONE,
    error_length_required => LENGTH_REQUIRED,
    error_precondition_failed => PRECONDITION_FAILED,
    error_payload_too_large => PAYLOAD_TOO_LARGE,
    error_unsupported_media_type => UNSUPPORTED_MEDIA_TYPE,
    error_unprocessable_entity => UNPROCESSABLE_ENTITY,
    error_locked => LOCKED,
    error_too_many_requests => TOO_MANY_REQUESTS,
    error_internal_server_error => INTERNAL_SERVER_ERROR,
    error_not_implemented => NOT_IMPLEMENTED,
    error_bad_gateway => BAD_GATEWAY,
    error_service_unavailable => SERVICE_UNAVAILABLE,
    error_gateway_timeout => GATEWAY_TIMEOUT,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn first_write_locks_status() {
        let mut ctx = Context::new(Method::GET, "/");
        ctx.respond_created(&serde_json::json!({"id": 1}));
        ctx.error_conflict("duplicate");

        assert_eq!(ctx.status(), Some(StatusCode::CREATED));
        assert_eq!(ctx.response().body_writes(), 2);
        let body = String::from_utf8(ctx.response().body().to_vec()).unwrap();
        assert_eq!(body, "{\"id\":1}\n{\"error\":\"duplicate\"}\n");
    }

    #[test]
    fn headers_are_frozen_after_status() {
        let mut ctx = Context::new(Method::GET, "/");
        assert!(ctx.set_header(HeaderName::from_static("x-before"), "1"));
        ctx.respond_ok(&"done");
        assert!(!ctx.set_header(HeaderName::from_static("x-after"), "1"));

        let response = ctx.into_response();
        assert_eq!(response.headers()["x-before"], "1");
        assert!(response.headers().get("x-after").is_none());
        assert_eq!(response.headers()[header::CONTENT_TYPE], APPLICATION_JSON);
    }

    #[test]
    fn unset_status_defaults_to_ok() {
        let ctx = Context::new(Method::GET, "/");
        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }

    #[test]
    fn abort_with_error_hides_detail() {
        let mut ctx = Context::new(Method::GET, "/orders");
        ctx.abort_with_error(StatusCode::INTERNAL_SERVER_ERROR, "db password rejected");

        let body: ErrorBody = serde_json::from_slice(ctx.response().body()).unwrap();
        assert!(body.error.starts_with("Something went wrong. Error ID: "));
        assert!(!body.error.contains("password"));
    }

    #[test]
    fn no_content_drops_body() {
        let mut ctx = Context::new(Method::DELETE, "/products/1");
        ctx.respond_no_content(&serde_json::json!({"deleted": true}));
        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }
}
