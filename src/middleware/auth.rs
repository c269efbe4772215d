//! Authentication middleware.
//!
//! Each middleware extracts a credential, hands it to a
//! `CredentialValidator` and, on success, stores the resulting `Identity`
//! in the data store under the given key. Failures answer 401 and stop
//! the chain.

use std::sync::Arc;

use http::header;
use tracing::{debug, warn};

use super::{from_fn, Middleware};
use crate::{
    constants::auth::BEARER_PREFIX,
    context::Context,
    errors::AppError,
    features::auth::{check_roles, CredentialValidator, Identity},
};

/// Authenticates `Authorization: Bearer <token>`.
pub fn bearer<V>(validator: Arc<V>, data_key: &str) -> Middleware
where
    V: CredentialValidator + ?Sized + 'static,
{
    let data_key = data_key.to_string();
    from_fn(move |ctx, next| {
        let result = extract_bearer_token(ctx)
            .and_then(|token| validator.validate(token).map_err(AppError::from));
        match result {
            Ok(identity) => {
                debug!(user_id = %identity.user_id, token = "***", "bearer authenticated");
                ctx.set(data_key.as_str(), identity);
                next(ctx);
            }
            Err(err) => reject(ctx, err),
        }
    })
}

/// Authenticates the session token stored in cookie `cookie_name`.
pub fn cookie<V>(validator: Arc<V>, cookie_name: &str, data_key: &str) -> Middleware
where
    V: CredentialValidator + ?Sized + 'static,
{
    let cookie_name = cookie_name.to_string();
    let data_key = data_key.to_string();
    from_fn(move |ctx, next| {
        let result = ctx
            .cookie(&cookie_name)
            .filter(|value| !value.is_empty())
            .ok_or(AppError::MissingSessionCookie)
            .and_then(|value| validator.validate(value).map_err(AppError::from));
        match result {
            Ok(identity) => {
                debug!(user_id = %identity.user_id, "session authenticated");
                ctx.set(data_key.as_str(), identity);
                next(ctx);
            }
            Err(err) => reject(ctx, err),
        }
    })
}

/// Answers 403 unless the identity under `data_key` holds every role.
/// Must run after `bearer` or `cookie`; a missing identity is a 401.
pub fn require_roles(data_key: &str, roles: &[&str]) -> Middleware {
    let data_key = data_key.to_string();
    let required: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
    from_fn(move |ctx, next| {
        let result = match ctx.get::<Identity>(&data_key) {
            Some(identity) => check_roles(&identity.roles, &required),
            None => Err(AppError::MissingAuthToken),
        };
        match result {
            Ok(()) => next(ctx),
            Err(err) => reject(ctx, err),
        }
    })
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(ctx: &Context) -> Result<&str, AppError> {
    let auth_header = ctx
        .header(header::AUTHORIZATION)
        .ok_or(AppError::MissingAuthToken)?;

    let token = auth_header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AppError::InvalidAuthHeader)?
        .trim();
    if token.is_empty() {
        return Err(AppError::InvalidAuthHeader);
    }
    Ok(token)
}

fn reject(ctx: &mut Context, err: AppError) {
    warn!(method = %ctx.method(), path = ctx.path(), reason = %err, "authentication rejected");
    ctx.abort(err);
}
