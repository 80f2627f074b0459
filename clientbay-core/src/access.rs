//! Dual-party authorization resolver.
//!
//! Every operation, agency-side or client-side, asks this resolver one
//! question: as which party may this user act on this resource? Agency
//! access flows from a `workspace_members` row for the workspace that
//! transitively owns the resource; client-side access flows from a
//! `client_contacts` row for the owning client. A user can hold both kinds
//! of identity at once (for different tenants, or even the same one);
//! agency membership wins when both apply to a single resource.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::WorkspaceRole;

/// A resource named by id. The resolver walks ownership upward
/// (project -> client -> workspace) as needed.
#[derive(Clone, Copy, Debug)]
pub enum ResourceRef {
    Workspace(Uuid),
    Client(Uuid),
    Project(Uuid),
    Approval(Uuid),
    Invoice(Uuid),
    File(Uuid),
    Message(Uuid),
}

/// The party a user acts as for one resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Agency { workspace_id: Uuid, role: WorkspaceRole },
    ClientSide { workspace_id: Uuid, client_id: Uuid },
    /// Neither membership nor contact matches, or the resource is absent.
    /// Callers map this to `NotFound` on agency-style endpoints and to
    /// `Forbidden` where the URL already implies the resource exists.
    None,
}

impl Access {
    pub fn is_agency(&self) -> bool {
        matches!(self, Access::Agency { .. })
    }

    /// Destructive operations additionally require owner or admin.
    pub fn can_delete(&self) -> bool {
        matches!(self, Access::Agency { role, .. } if role.is_admin())
    }

    pub fn workspace_id(&self) -> Option<Uuid> {
        match self {
            Access::Agency { workspace_id, .. } | Access::ClientSide { workspace_id, .. } => {
                Some(*workspace_id)
            }
            Access::None => None,
        }
    }
}

/// A user's (single) workspace membership.
#[derive(Clone, Copy, Debug, sqlx::FromRow)]
pub struct Membership {
    pub workspace_id: Uuid,
    pub role: WorkspaceRole,
}

/// Ownership chain of a resource: the workspace that owns it and, when the
/// resource sits under a client, that client.
#[derive(Clone, Copy, Debug, sqlx::FromRow)]
struct Scope {
    workspace_id: Uuid,
    client_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AccessResolver {
    pool: SqlitePool,
}

impl AccessResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve the party `user_id` acts as for `resource`.
    pub async fn resolve(&self, user_id: Uuid, resource: ResourceRef) -> CoreResult<Access> {
        let Some(scope) = self.scope_of(resource).await? else {
            return Ok(Access::None);
        };

        if let Some(membership) = self.membership(user_id).await? {
            if membership.workspace_id == scope.workspace_id {
                return Ok(Access::Agency {
                    workspace_id: membership.workspace_id,
                    role: membership.role,
                });
            }
        }

        if let Some(client_id) = scope.client_id {
            let contact: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM client_contacts WHERE user_id = ? AND client_id = ?")
                    .bind(user_id)
                    .bind(client_id)
                    .fetch_optional(&self.pool)
                    .await?;
            if contact.is_some() {
                return Ok(Access::ClientSide {
                    workspace_id: scope.workspace_id,
                    client_id,
                });
            }
        }

        Ok(Access::None)
    }

    /// The caller's workspace membership, if any. List endpoints use this as
    /// the scope for their WHERE clauses; they never fetch unscoped rows and
    /// filter afterwards.
    pub async fn membership(&self, user_id: Uuid) -> CoreResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT workspace_id, role FROM workspace_members WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    /// Like [`membership`](Self::membership) but mapping absence to
    /// `NotFound`, matching what agency endpoints return for users with no
    /// workspace.
    pub async fn require_membership(&self, user_id: Uuid) -> CoreResult<Membership> {
        self.membership(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("workspace"))
    }

    async fn scope_of(&self, resource: ResourceRef) -> CoreResult<Option<Scope>> {
        let scope = match resource {
            ResourceRef::Workspace(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT id AS workspace_id, NULL AS client_id FROM workspaces WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            ResourceRef::Client(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT workspace_id, id AS client_id FROM clients WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            ResourceRef::Project(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT c.workspace_id, p.client_id
                     FROM projects p JOIN clients c ON c.id = p.client_id
                     WHERE p.id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            ResourceRef::Approval(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT c.workspace_id, p.client_id
                     FROM approval_requests a
                     JOIN projects p ON p.id = a.project_id
                     JOIN clients c ON c.id = p.client_id
                     WHERE a.id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            ResourceRef::Invoice(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT c.workspace_id, i.client_id
                     FROM invoices i JOIN clients c ON c.id = i.client_id
                     WHERE i.id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            ResourceRef::File(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT c.workspace_id, p.client_id
                     FROM files f
                     JOIN projects p ON p.id = f.project_id
                     JOIN clients c ON c.id = p.client_id
                     WHERE f.id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            ResourceRef::Message(id) => {
                sqlx::query_as::<_, Scope>(
                    "SELECT c.workspace_id, p.client_id
                     FROM messages m
                     JOIN projects p ON p.id = m.project_id
                     JOIN clients c ON c.id = p.client_id
                     WHERE m.id = ?",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(scope)
    }
}
