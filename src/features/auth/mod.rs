//! Credential validation used by `middleware::auth`.
//!
//! The router only extracts a credential (bearer token or cookie value) and
//! asks a `CredentialValidator` who it belongs to. Validators shared across
//! concurrent requests must synchronize internally.

pub mod jwt;
pub mod session;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub use jwt::{Claims, JwtValidator};
pub use session::{clear_session_cookie, set_session_cookie, SessionStore};

/// Authenticated caller, stored in the context data store on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token string is empty")]
    EmptyCredential,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("token issued in the future")]
    IssuedInFuture,
    #[error("Unknown or expired session")]
    UnknownSession,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub trait CredentialValidator: Send + Sync {
    /// Resolves a raw credential to the identity it was issued for.
    fn validate(&self, credential: &str) -> Result<Identity, AuthError>;
}

pub fn check_roles(user_roles: &[String], required_roles: &[String]) -> Result<(), AppError> {
    let user_roles_set: HashSet<_> = user_roles.iter().collect();
    for required_role in required_roles {
        if !user_roles_set.contains(required_role) {
            return Err(AppError::InsufficientPermissions);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_roles() {
        let roles = vec!["user".to_string(), "admin".to_string()];
        assert!(check_roles(&roles, &["admin".to_string()]).is_ok());
        assert!(check_roles(&roles, &[]).is_ok());
        assert!(matches!(
            check_roles(&roles, &["owner".to_string()]),
            Err(AppError::InsufficientPermissions)
        ));
    }
}
