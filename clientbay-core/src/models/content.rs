use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

/// Project-scoped conversation, authored by either side.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub author: User,
}

/// Agency-authored status update on a project.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// File metadata; the bytes live behind [`crate::storage::BlobStorage`].
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: Uuid,
    pub project_id: Uuid,
    pub uploaded_by_id: Uuid,
    pub name: String,
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[garde(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdateRequest {
    #[garde(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Validate)]
pub struct FileUpload {
    #[garde(skip)]
    pub project_id: Uuid,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(length(min = 1, max = 100))]
    pub content_type: String,
    #[garde(skip)]
    pub bytes: Vec<u8>,
}
