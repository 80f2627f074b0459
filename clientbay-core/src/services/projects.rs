//! Project CRUD and status transitions.

use chrono::Utc;
use garde::Validate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::{Access, AccessResolver, ResourceRef};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, CreateProjectRequest, Project, ProjectStatus, UpdateProjectRequest,
};
use crate::services::activity::{ActivityLog, NewActivity};

const PROJECT_COLUMNS: &str =
    "id, client_id, name, description, status, start_date, due_date, created_at, updated_at";

#[derive(Clone)]
pub struct ProjectService {
    pool: SqlitePool,
    resolver: AccessResolver,
    log: ActivityLog,
}

impl ProjectService {
    pub fn new(pool: SqlitePool, log: ActivityLog) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver, log }
    }

    /// Agency listing, scoped to the caller's workspace inside the query.
    pub async fn list(&self, user_id: Uuid, client_id: Option<Uuid>) -> CoreResult<Vec<Project>> {
        let membership = self.resolver.require_membership(user_id).await?;
        let projects = sqlx::query_as::<_, Project>(
            "SELECT p.id, p.client_id, p.name, p.description, p.status, p.start_date,
                    p.due_date, p.created_at, p.updated_at
             FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ?
               AND (? IS NULL OR p.client_id = ?)
             ORDER BY p.created_at DESC",
        )
        .bind(membership.workspace_id)
        .bind(client_id)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    /// Portal listing: every project under a client the user is a contact
    /// for, across workspaces.
    pub async fn list_for_contact(&self, user_id: Uuid) -> CoreResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT p.id, p.client_id, p.name, p.description, p.status, p.start_date,
                    p.due_date, p.created_at, p.updated_at
             FROM projects p
             JOIN client_contacts cc ON cc.client_id = p.client_id
             WHERE cc.user_id = ?
             ORDER BY p.updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    /// Readable by either party.
    pub async fn get(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<Project> {
        let access = self.resolver.resolve(user_id, ResourceRef::Project(project_id)).await?;
        if access == Access::None {
            return Err(CoreError::not_found("project"));
        }
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(project)
    }

    pub async fn create(&self, user_id: Uuid, req: CreateProjectRequest) -> CoreResult<Project> {
        req.validate()?;
        let membership = self.resolver.require_membership(user_id).await?;

        // Scoped existence check; a client in another workspace is "absent".
        let owned: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM clients WHERE id = ? AND workspace_id = ?")
                .bind(req.client_id)
                .bind(membership.workspace_id)
                .fetch_optional(&self.pool)
                .await?;
        if owned.is_none() {
            return Err(CoreError::not_found("client"));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            client_id: req.client_id,
            name: req.name,
            description: req.description,
            status: req.status.unwrap_or(ProjectStatus::NotStarted),
            start_date: req.start_date,
            due_date: req.due_date,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO projects
                 (id, client_id, name, description, status, start_date, due_date,
                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(project.id)
        .bind(project.client_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.start_date)
        .bind(project.due_date)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        self.log
            .record(NewActivity {
                workspace_id: membership.workspace_id,
                user_id,
                action: ActivityAction::ProjectCreated,
                description: format!("Created project \"{}\"", project.name),
                entity_id: Some(project.id),
                project_id: Some(project.id),
                client_id: Some(project.client_id),
                metadata: None,
            })
            .await;

        Ok(project)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: UpdateProjectRequest,
    ) -> CoreResult<Project> {
        req.validate()?;
        let access = self.resolver.resolve(user_id, ResourceRef::Project(project_id)).await?;
        let workspace_id = match access {
            Access::Agency { workspace_id, .. } => workspace_id,
            // Client-side identities read projects but never mutate them.
            Access::ClientSide { .. } => {
                return Err(CoreError::Forbidden("clients cannot modify projects".into()))
            }
            Access::None => return Err(CoreError::not_found("project")),
        };

        let before = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            "UPDATE projects
             SET name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 status = COALESCE(?, status),
                 start_date = COALESCE(?, start_date),
                 due_date = COALESCE(?, due_date),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(req.name)
        .bind(req.description)
        .bind(req.status)
        .bind(req.start_date)
        .bind(req.due_date)
        .bind(Utc::now())
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        let (action, description) = if project.status != before.status {
            (
                ActivityAction::ProjectStatusChanged,
                format!(
                    "Moved project \"{}\" to {}",
                    project.name,
                    project.status.label()
                ),
            )
        } else {
            (
                ActivityAction::ProjectUpdated,
                format!("Updated project \"{}\"", project.name),
            )
        };

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action,
                description,
                entity_id: Some(project.id),
                project_id: Some(project.id),
                client_id: Some(project.client_id),
                metadata: None,
            })
            .await;

        Ok(project)
    }

    /// Destructive: owner/admin only.
    pub async fn delete(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<()> {
        let access = self.resolver.resolve(user_id, ResourceRef::Project(project_id)).await?;
        let workspace_id = match access {
            Access::Agency { workspace_id, .. } if access.can_delete() => workspace_id,
            Access::Agency { .. } => {
                return Err(CoreError::Forbidden(
                    "deleting a project requires an owner or admin role".into(),
                ))
            }
            _ => return Err(CoreError::not_found("project")),
        };

        let (name, client_id): (String, Uuid) =
            sqlx::query_as("SELECT name, client_id FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_one(&self.pool)
                .await?;

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::ProjectDeleted,
                description: format!("Deleted project \"{name}\""),
                entity_id: Some(project_id),
                project_id: Some(project_id),
                client_id: Some(client_id),
                metadata: None,
            })
            .await;

        Ok(())
    }
}
