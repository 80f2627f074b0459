//! Bearer-token identity.
//!
//! Handlers take a [`CurrentUser`] parameter; extraction validates the
//! HS256 token and resolves the caller to a `users` row, creating it on
//! first sight. The row id, not the token subject, is the canonical user
//! id everywhere downstream, so a user invited by email before their first
//! login keeps the identity the invite created.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use clientbay_core::error::CoreError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
}

/// Symmetric signing/verification keys derived from one secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Mint a token for `email`, valid for 24 hours.
    pub fn issue(&self, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: email.to_owned(),
            exp: (Utc::now() + chrono::Duration::hours(24)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError(CoreError::Unauthenticated))?;
        let claims = state.jwt.verify(token).map_err(|err| {
            tracing::debug!(%err, "rejecting bearer token");
            ApiError(CoreError::Unauthenticated)
        })?;

        // Find or create the user row; the email is the stable key.
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)
             ON CONFLICT (email) DO UPDATE SET email = excluded.email
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&claims.email)
        .bind(Utc::now())
        .fetch_one(&state.pool)
        .await
        .map_err(|err| ApiError(CoreError::from(err)))?;

        Ok(CurrentUser { id, email: claims.email })
    }
}
