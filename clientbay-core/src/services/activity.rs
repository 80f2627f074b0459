//! Append-only activity log.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::access::AccessResolver;
use crate::error::CoreResult;
use crate::models::{ActivityAction, ActivityEntry};

/// One entry to record. The entity kind is taken from the action itself,
/// never parsed back out of the code string.
#[derive(Debug)]
pub struct NewActivity {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub description: String,
    pub entity_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ActivityFilter {
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub limit: Option<u32>,
}

#[derive(Clone)]
pub struct ActivityLog {
    pool: SqlitePool,
    resolver: AccessResolver,
}

impl ActivityLog {
    pub fn new(pool: SqlitePool) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver }
    }

    /// Record an entry. Fire-and-forget: a failed insert is warned and
    /// swallowed so it can never abort the mutation it annotates.
    pub async fn record(&self, entry: NewActivity) {
        if let Err(err) = self.insert(&entry).await {
            warn!(
                action = entry.action.code(),
                workspace_id = %entry.workspace_id,
                %err,
                "failed to record activity"
            );
        }
    }

    async fn insert(&self, entry: &NewActivity) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO activity_log
                 (id, workspace_id, user_id, action, entity_type, entity_id,
                  description, project_id, client_id, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(entry.workspace_id)
        .bind(entry.user_id)
        .bind(entry.action.code())
        .bind(entry.action.entity_kind().code())
        .bind(entry.entity_id)
        .bind(&entry.description)
        .bind(entry.project_id)
        .bind(entry.client_id)
        .bind(entry.metadata.as_ref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Workspace-scoped listing, newest first. Agency-side only; the scope
    /// comes from the caller's membership, not from request input.
    pub async fn list(&self, user_id: Uuid, filter: ActivityFilter) -> CoreResult<Vec<ActivityEntry>> {
        let membership = self.resolver.require_membership(user_id).await?;
        let limit = i64::from(filter.limit.unwrap_or(50).min(100));

        let entries = sqlx::query_as::<_, ActivityEntry>(
            "SELECT id, workspace_id, user_id, action, entity_type, entity_id,
                    description, project_id, client_id, metadata, created_at
             FROM activity_log
             WHERE workspace_id = ?
               AND (? IS NULL OR project_id = ?)
               AND (? IS NULL OR client_id = ?)
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(membership.workspace_id)
        .bind(filter.project_id)
        .bind(filter.project_id)
        .bind(filter.client_id)
        .bind(filter.client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
