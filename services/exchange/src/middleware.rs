//! Authentication middleware for bearer token validation

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    error::{ApiError, ApiResult},
    models::Identity,
    state::AppState,
};

/// Claims issued by the identity service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Provider-assigned subject
    pub sub: String,
    pub preferred_username: Option<String>,
    pub name: Option<String>,
    /// Expiration time
    pub exp: u64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            provider_id: self.sub.clone(),
            username: self
                .preferred_username
                .clone()
                .unwrap_or_else(|| self.sub.clone()),
            display_name: self.name.clone(),
        }
    }
}

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Verifies bearer tokens against the configured key
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &JwtConfig) -> Result<Self, String> {
        let (key, algorithm) = match config {
            JwtConfig::PublicKey(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| format!("Failed to create decoding key: {}", e))?,
                Algorithm::RS256,
            ),
            JwtConfig::Secret(secret) => {
                (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

/// Authentication middleware
///
/// Provisions the user on first sight and inserts an [`AuthUser`] into the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> ApiResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let claims = state.verifier.verify(bearer.token()).map_err(|e| {
        warn!("Failed to validate token: {}", e);
        ApiError::Unauthorized
    })?;

    let user = state
        .exchange
        .ensure_user(&claims.identity())
        .await
        .map_err(|e| {
            error!("Failed to provision user: {}", e);
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(AuthUser { id: user.id });

    Ok(next.run(req).await)
}
