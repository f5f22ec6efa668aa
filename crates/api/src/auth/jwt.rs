//! Session tokens for customers, staff and admins.
//!
//! A session token is an HS256 JWT naming the user and their role. The same
//! token authenticates REST calls (`Authorization: Bearer`) and the `/ws`
//! upgrade (`?token=`), so both paths go through [`authenticate_token`].

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use servicedesk_core::roles::validate_role;
use servicedesk_core::types::DbId;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;

/// Default session lifetime in minutes (one day).
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 1440;

/// Payload of a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: DbId,
    /// Role at the time of login.
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique per issued token.
    pub jti: String,
}

/// Signing secret and session lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
}

impl JwtConfig {
    /// Load from `JWT_SECRET` (required) and `JWT_ACCESS_EXPIRY_MINS`
    /// (default `1440`).
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or the expiry is not a
    /// positive number of minutes.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");
        assert!(
            access_token_expiry_mins > 0,
            "JWT_ACCESS_EXPIRY_MINS must be positive"
        );

        Self {
            secret,
            access_token_expiry_mins,
        }
    }

    /// Session lifetime in seconds, as reported to clients in `expires_in`.
    pub fn expires_in_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }
}

/// Why a token was refused.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("{0}")]
    UnknownRole(String),
}

/// A freshly signed session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// Sign a session token for `user_id` acting as `role`.
pub fn issue_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<IssuedToken, TokenError> {
    let now = chrono::Utc::now().timestamp();
    let expires_in = config.expires_in_secs();

    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + expires_in,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok(IssuedToken { token, expires_in })
}

/// Verify a session token and resolve the caller.
///
/// The signature and `exp` are checked, and the role must be one the
/// service knows.
pub fn authenticate_token(token: &str, config: &JwtConfig) -> Result<AuthUser, TokenError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;
    validate_role(&claims.role).map_err(TokenError::UnknownRole)?;

    Ok(AuthUser {
        user_id: claims.sub,
        role: claims.role,
    })
}
