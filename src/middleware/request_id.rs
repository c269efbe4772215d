use http::HeaderName;
use uuid::Uuid;

use super::{from_fn, Middleware};
use crate::constants::{data_keys, headers::REQUEST_ID};

/// Reuses the caller's `X-Request-ID` or mints one, then exposes it in the
/// data store and echoes it on the response.
pub fn request_id() -> Middleware {
    from_fn(|ctx, next| {
        let id = ctx
            .header(REQUEST_ID)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        ctx.set_header(HeaderName::from_static(REQUEST_ID), &id);
        ctx.set(data_keys::REQUEST_ID, id);
        next(ctx);
    })
}
