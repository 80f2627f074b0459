use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
}

impl WorkspaceRole {
    /// Destructive operations (deleting clients, projects, invoices) and
    /// team management require owner or admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, WorkspaceRole::Owner | WorkspaceRole::Admin)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Plan {
    Trial,
    Starter,
    Professional,
    Agency,
}

#[derive(Clone, Copy, Debug)]
pub struct PlanLimits {
    pub clients: u32,
    pub members: u32,
    pub storage_bytes: u64,
}

impl Plan {
    pub fn limits(&self) -> PlanLimits {
        const GB: u64 = 1024 * 1024 * 1024;
        match self {
            Plan::Trial => PlanLimits { clients: 20, members: 10, storage_bytes: 50 * GB },
            Plan::Starter => PlanLimits { clients: 5, members: 3, storage_bytes: 10 * GB },
            Plan::Professional => PlanLimits { clients: 20, members: 10, storage_bytes: 50 * GB },
            Plan::Agency => PlanLimits {
                clients: u32::MAX,
                members: u32::MAX,
                storage_bytes: 200 * GB,
            },
        }
    }
}

/// An agency tenant. Owns clients and everything under them.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub brand_color: String,
    pub plan: Plan,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: WorkspaceRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub member: WorkspaceMember,
    pub user: User,
}

fn hex_color(value: &str, _ctx: &()) -> garde::Result {
    let ok = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(garde::Error::new("must be a #rrggbb color"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceRequest {
    #[garde(length(min = 2, max = 100))]
    pub name: String,
    #[garde(length(min = 2, max = 100), ascii)]
    pub slug: String,
    #[garde(inner(custom(hex_color)))]
    pub brand_color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkspaceRequest {
    #[garde(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[garde(inner(custom(hex_color)))]
    pub brand_color: Option<String>,
}

/// Invitees can only be given admin or member; ownership is not grantable
/// through an invite.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteRole {
    Admin,
    Member,
}

impl From<InviteRole> for WorkspaceRole {
    fn from(role: InviteRole) -> Self {
        match role {
            InviteRole::Admin => WorkspaceRole::Admin,
            InviteRole::Member => WorkspaceRole::Member,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberRequest {
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    pub role: InviteRole,
}
