use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::Project;
use super::user::User;

/// A workspace's customer record.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-side identity: joins a user to one client, independent of any
/// workspace membership the same user may hold elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub id: Uuid,
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: Uuid,
    pub is_primary: bool,
    pub user: User,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub contacts: Vec<ContactView>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,
    /// Email of the primary contact; the user is created if unknown.
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[garde(skip)]
    pub notes: Option<String>,
}
