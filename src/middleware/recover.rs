//! Panic boundary.
//!
//! Install first so it wraps everything else. A panic anywhere below is
//! turned into a 500 carrying an opaque error id; the detail only goes to
//! the log.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use tracing::error;

use super::{from_fn, Middleware};
use crate::utils::correlation_id;

pub fn recover() -> Middleware {
    from_fn(|ctx, next| {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next(ctx)));
        let Err(payload) = outcome else {
            return;
        };

        let error_id = correlation_id();
        error!(
            error_id = %error_id,
            method = %ctx.method(),
            path = ctx.path(),
            request_id = ctx.request_id().unwrap_or("n/a"),
            panic = %panic_message(payload.as_ref()),
            "recovered from panic"
        );
        ctx.error_internal_server_error(format!(
            "An unexpected error occurred. Error ID: {error_id}"
        ));
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
