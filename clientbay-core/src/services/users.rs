//! The caller's own profile. Everything else about a user is managed
//! through workspace membership or client contacts.

use garde::Validate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{UpdateProfileRequest, User};

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Callers can only update themselves; the id comes from the verified
    /// identity, never from the payload.
    pub async fn update_profile(&self, user_id: Uuid, req: UpdateProfileRequest) -> CoreResult<User> {
        req.validate()?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = COALESCE(?, name) WHERE id = ?
             RETURNING id, email, name, avatar_url, created_at",
        )
        .bind(req.name)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
