//! Identity resolution for connecting clients.
//!
//! The room core never authenticates anyone itself. A transport hands the
//! token it received to an [`IdentityProvider`] and works with the returned
//! [`Identity`] from then on.
//!
//! ## Example
//!
//! ```
//! use card_rooms::auth::{Identity, IdentityProvider, JwtIdentityProvider};
//! use chrono::Duration;
//!
//! let provider = JwtIdentityProvider::new("a-secret-that-is-at-least-32-bytes!");
//! let token = provider
//!     .issue(&Identity::new(7, "alice"), Duration::minutes(5))
//!     .unwrap();
//! let identity = provider.resolve(&token).unwrap();
//! assert_eq!(identity.user_id, 7);
//! ```

pub mod errors;

pub use errors::{AuthError, AuthResult};

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::game::UserId;

/// Authenticated user as seen by rooms and sessions
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
}

impl Identity {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Turns a bearer token into an identity
pub trait IdentityProvider: Send + Sync + 'static {
    fn resolve(&self, token: &str) -> AuthResult<Identity>;
}

/// JWT claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: UserId,
    pub name: String,
    pub exp: i64,
}

/// HS256 JWT identity provider
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for `identity`, valid for `ttl`
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> AuthResult<String> {
        let claims = IdentityClaims {
            sub: identity.user_id,
            name: identity.display_name.clone(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn resolve(&self, token: &str) -> AuthResult<Identity> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data = decode::<IdentityClaims>(token, &self.decoding_key, &Validation::default())?;
        let claims = token_data.claims;

        let name = claims.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidClaims("empty name".to_string()));
        }

        Ok(Identity::new(claims.sub, name))
    }
}
