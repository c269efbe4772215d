use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthError, CredentialValidator, Identity};
use crate::{config::SecretsConfig, constants::auth::BEARER_PREFIX};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String, // Subject (User Id)
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
}

/// HS256 token issuer and validator.
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn from_secrets(secrets: &SecretsConfig) -> Self {
        Self::new(secrets.jwt_secret.as_bytes())
    }

    /// Signs a token for `user_id` valid for `ttl`.
    pub fn issue(&self, user_id: &str, roles: &[String], ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            roles: roles.to_vec(),
            exp: now + ttl.as_secs() as usize,
            iat: Some(now),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|error| match error.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        let now = Utc::now().timestamp().max(0) as usize;
        if claims.iat.is_some_and(|iat| iat > now + self.validation.leeway as usize) {
            return Err(AuthError::IssuedInFuture);
        }
        Ok(claims)
    }
}

impl CredentialValidator for JwtValidator {
    fn validate(&self, credential: &str) -> Result<Identity, AuthError> {
        debug!(token = "***", "validating jwt");
        let token = credential.strip_prefix(BEARER_PREFIX).unwrap_or(credential).trim();
        if token.is_empty() {
            return Err(AuthError::EmptyCredential);
        }
        let claims = self.decode(token)?;
        Ok(Identity::new(claims.sub, claims.roles))
    }
}
