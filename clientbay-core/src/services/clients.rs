//! Client records and their contacts.

use chrono::Utc;
use garde::Validate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::{Access, AccessResolver, ResourceRef};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, Client, ClientDetail, ContactView, CreateClientRequest, Project,
    UpdateClientRequest, User,
};
use crate::services::activity::{ActivityLog, NewActivity};

const CLIENT_COLUMNS: &str = "id, workspace_id, name, notes, created_at, updated_at";

#[derive(Clone)]
pub struct ClientService {
    pool: SqlitePool,
    resolver: AccessResolver,
    log: ActivityLog,
}

impl ClientService {
    pub fn new(pool: SqlitePool, log: ActivityLog) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver, log }
    }

    pub async fn list(&self, user_id: Uuid) -> CoreResult<Vec<Client>> {
        let membership = self.resolver.require_membership(user_id).await?;
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE workspace_id = ? ORDER BY created_at DESC"
        ))
        .bind(membership.workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(clients)
    }

    pub async fn get(&self, user_id: Uuid, client_id: Uuid) -> CoreResult<ClientDetail> {
        let access = self.resolver.resolve(user_id, ResourceRef::Client(client_id)).await?;
        if !access.is_agency() {
            return Err(CoreError::not_found("client"));
        }

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?"
        ))
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        let contacts = self.contacts(client_id).await?;

        let projects = sqlx::query_as::<_, Project>(
            "SELECT id, client_id, name, description, status, start_date, due_date,
                    created_at, updated_at
             FROM projects WHERE client_id = ? ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ClientDetail { client, contacts, projects })
    }

    /// Create a client and its primary contact in one transaction: a client
    /// is never observable without a contact. The contact user is created
    /// on first reference.
    pub async fn create(&self, user_id: Uuid, req: CreateClientRequest) -> CoreResult<ClientDetail> {
        req.validate()?;
        let membership = self.resolver.require_membership(user_id).await?;

        let plan: crate::models::Plan =
            sqlx::query_scalar("SELECT plan FROM workspaces WHERE id = ?")
                .bind(membership.workspace_id)
                .fetch_one(&self.pool)
                .await?;
        let client_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE workspace_id = ?")
                .bind(membership.workspace_id)
                .fetch_one(&self.pool)
                .await?;
        if client_count as u64 >= u64::from(plan.limits().clients) {
            return Err(CoreError::Conflict("client limit reached for this plan".into()));
        }

        let contact_user_id = super::upsert_user_by_email(&self.pool, &req.email).await?;

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            workspace_id: membership.workspace_id,
            name: req.name,
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO clients (id, workspace_id, name, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(client.id)
        .bind(client.workspace_id)
        .bind(&client.name)
        .bind(&client.notes)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO client_contacts (id, client_id, user_id, is_primary, created_at)
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(client.id)
        .bind(contact_user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.log
            .record(NewActivity {
                workspace_id: membership.workspace_id,
                user_id,
                action: ActivityAction::ClientCreated,
                description: format!("Added client \"{}\"", client.name),
                entity_id: Some(client.id),
                project_id: None,
                client_id: Some(client.id),
                metadata: None,
            })
            .await;

        let contacts = self.contacts(client.id).await?;
        Ok(ClientDetail { client, contacts, projects: Vec::new() })
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        client_id: Uuid,
        req: UpdateClientRequest,
    ) -> CoreResult<Client> {
        req.validate()?;
        let access = self.resolver.resolve(user_id, ResourceRef::Client(client_id)).await?;
        if !access.is_agency() {
            return Err(CoreError::not_found("client"));
        }

        sqlx::query(
            "UPDATE clients
             SET name = COALESCE(?, name), notes = COALESCE(?, notes), updated_at = ?
             WHERE id = ?",
        )
        .bind(req.name)
        .bind(req.notes)
        .bind(Utc::now())
        .bind(client_id)
        .execute(&self.pool)
        .await?;

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?"
        ))
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        self.log
            .record(NewActivity {
                workspace_id: client.workspace_id,
                user_id,
                action: ActivityAction::ClientUpdated,
                description: format!("Updated client \"{}\"", client.name),
                entity_id: Some(client.id),
                project_id: None,
                client_id: Some(client.id),
                metadata: None,
            })
            .await;

        Ok(client)
    }

    /// Destructive: owner/admin only. Cascades to projects, invoices, and
    /// everything underneath.
    pub async fn delete(&self, user_id: Uuid, client_id: Uuid) -> CoreResult<()> {
        let access = self.resolver.resolve(user_id, ResourceRef::Client(client_id)).await?;
        let workspace_id = match access {
            Access::Agency { workspace_id, .. } if access.can_delete() => workspace_id,
            Access::Agency { .. } => {
                return Err(CoreError::Forbidden(
                    "deleting a client requires an owner or admin role".into(),
                ))
            }
            _ => return Err(CoreError::not_found("client")),
        };

        let name: String = sqlx::query_scalar("SELECT name FROM clients WHERE id = ?")
            .bind(client_id)
            .fetch_one(&self.pool)
            .await?;

        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::ClientDeleted,
                description: format!("Deleted client \"{name}\""),
                entity_id: Some(client_id),
                project_id: None,
                client_id: Some(client_id),
                metadata: None,
            })
            .await;

        Ok(())
    }

    async fn contacts(&self, client_id: Uuid) -> CoreResult<Vec<ContactView>> {
        let rows: Vec<(Uuid, bool, Uuid, String, Option<String>, Option<String>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT cc.id, cc.is_primary, u.id, u.email, u.name, u.avatar_url, u.created_at
                 FROM client_contacts cc
                 JOIN users u ON u.id = cc.user_id
                 WHERE cc.client_id = ?
                 ORDER BY cc.is_primary DESC, cc.created_at ASC",
            )
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, is_primary, u_id, email, name, avatar_url, created_at)| ContactView {
                id,
                is_primary,
                user: User { id: u_id, email, name, avatar_url, created_at },
            })
            .collect())
    }
}
