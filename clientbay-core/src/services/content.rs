//! Project-scoped content: message threads, agency status updates, and
//! file attachments backed by a [`BlobStorage`] implementation.

use std::sync::Arc;

use chrono::Utc;
use garde::Validate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::{Access, AccessResolver, ResourceRef};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, FileUpload, Message, MessageView, PostMessageRequest, PostUpdateRequest,
    ProjectUpdate, StoredFile, User,
};
use crate::notify::{Notification, NotificationQueue};
use crate::services::activity::{ActivityLog, NewActivity};
use crate::storage::BlobStorage;

#[derive(Clone)]
pub struct ContentService {
    pool: SqlitePool,
    resolver: AccessResolver,
    log: ActivityLog,
    notifications: NotificationQueue,
    storage: Arc<dyn BlobStorage>,
}

/// A project's workspace and name, fetched once per operation for access
/// checks and activity descriptions.
struct ProjectHead {
    workspace_id: Uuid,
    client_id: Uuid,
    name: String,
}

impl ContentService {
    pub fn new(
        pool: SqlitePool,
        log: ActivityLog,
        notifications: NotificationQueue,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver, log, notifications, storage }
    }

    // ---- messages ----

    /// Both parties read the thread.
    pub async fn list_messages(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<Vec<MessageView>> {
        self.require_project_access(user_id, project_id).await?;
        let rows: Vec<(Uuid, Uuid, Uuid, String, chrono::DateTime<Utc>, String, Option<String>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT m.id, m.project_id, m.author_id, m.content, m.created_at,
                        u.email, u.name, u.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.author_id
                 WHERE m.project_id = ?
                 ORDER BY m.created_at ASC",
            )
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, project_id, author_id, content, created_at, email, name, user_created)| {
                MessageView {
                    message: Message { id, project_id, author_id, content, created_at },
                    author: User {
                        id: author_id,
                        email,
                        name,
                        avatar_url: None,
                        created_at: user_created,
                    },
                }
            })
            .collect())
    }

    /// Both parties post.
    pub async fn post_message(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: PostMessageRequest,
    ) -> CoreResult<Message> {
        req.validate()?;
        let (head, _) = self.require_project_access(user_id, project_id).await?;

        let message = Message {
            id: Uuid::new_v4(),
            project_id,
            author_id: user_id,
            content: req.content,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO messages (id, project_id, author_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id)
        .bind(message.project_id)
        .bind(message.author_id)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        self.log
            .record(NewActivity {
                workspace_id: head.workspace_id,
                user_id,
                action: ActivityAction::MessageSent,
                description: format!("Sent a message in \"{}\"", head.name),
                entity_id: Some(message.id),
                project_id: Some(project_id),
                client_id: Some(head.client_id),
                metadata: None,
            })
            .await;

        Ok(message)
    }

    // ---- project updates ----

    /// Both parties read the update feed, newest first.
    pub async fn list_updates(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<Vec<ProjectUpdate>> {
        self.require_project_access(user_id, project_id).await?;
        let updates = sqlx::query_as::<_, ProjectUpdate>(
            "SELECT id, project_id, author_id, content, created_at
             FROM project_updates WHERE project_id = ?
             ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    /// Agency only. Every contact of the project's client gets notified.
    pub async fn post_update(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: PostUpdateRequest,
    ) -> CoreResult<ProjectUpdate> {
        req.validate()?;
        let (head, access) = self.require_project_access(user_id, project_id).await?;
        if !access.is_agency() {
            return Err(CoreError::Forbidden("only team members can post updates".into()));
        }

        let update = ProjectUpdate {
            id: Uuid::new_v4(),
            project_id,
            author_id: user_id,
            content: req.content,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO project_updates (id, project_id, author_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(update.id)
        .bind(update.project_id)
        .bind(update.author_id)
        .bind(&update.content)
        .bind(update.created_at)
        .execute(&self.pool)
        .await?;

        self.log
            .record(NewActivity {
                workspace_id: head.workspace_id,
                user_id,
                action: ActivityAction::UpdatePosted,
                description: format!("Posted an update to \"{}\"", head.name),
                entity_id: Some(update.id),
                project_id: Some(project_id),
                client_id: Some(head.client_id),
                metadata: None,
            })
            .await;

        let contacts: Vec<String> = sqlx::query_scalar(
            "SELECT u.email FROM client_contacts cc
             JOIN users u ON u.id = cc.user_id
             WHERE cc.client_id = ?",
        )
        .bind(head.client_id)
        .fetch_all(&self.pool)
        .await?;
        let excerpt = excerpt_of(&update.content);
        for recipient in contacts {
            self.notifications.enqueue(Notification::UpdatePosted {
                recipient,
                project_name: head.name.clone(),
                excerpt: excerpt.clone(),
            });
        }

        Ok(update)
    }

    // ---- files ----

    /// Both parties see a project's files, newest first.
    pub async fn list_files(&self, user_id: Uuid, project_id: Uuid) -> CoreResult<Vec<StoredFile>> {
        self.require_project_access(user_id, project_id).await?;
        let files = sqlx::query_as::<_, StoredFile>(
            "SELECT id, project_id, uploaded_by_id, name, key, url, content_type, size, created_at
             FROM files WHERE project_id = ?
             ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    /// Store the blob first, then the row. A failed insert leaves an
    /// orphaned blob rather than a row pointing at nothing.
    pub async fn upload(&self, user_id: Uuid, upload: FileUpload) -> CoreResult<StoredFile> {
        upload.validate()?;
        let (head, _) = self.require_project_access(user_id, upload.project_id).await?;

        let key = format!("{}/{}-{}", upload.project_id, Uuid::new_v4(), upload.name);
        let size = upload.bytes.len() as i64;
        let url = self
            .storage
            .put(key.clone(), upload.content_type.clone(), upload.bytes)
            .await
            .map_err(|e| CoreError::Internal(format!("blob store: {e}")))?;

        let file = StoredFile {
            id: Uuid::new_v4(),
            project_id: upload.project_id,
            uploaded_by_id: user_id,
            name: upload.name,
            key,
            url,
            content_type: upload.content_type,
            size,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO files
                 (id, project_id, uploaded_by_id, name, key, url, content_type, size, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.id)
        .bind(file.project_id)
        .bind(file.uploaded_by_id)
        .bind(&file.name)
        .bind(&file.key)
        .bind(&file.url)
        .bind(&file.content_type)
        .bind(file.size)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;

        self.log
            .record(NewActivity {
                workspace_id: head.workspace_id,
                user_id,
                action: ActivityAction::FileUploaded,
                description: format!("Uploaded \"{}\" to \"{}\"", file.name, head.name),
                entity_id: Some(file.id),
                project_id: Some(file.project_id),
                client_id: Some(head.client_id),
                metadata: Some(serde_json::json!({ "size": file.size })),
            })
            .await;

        Ok(file)
    }

    /// The uploader, or an agency owner/admin, may delete. The row goes
    /// first; blob deletion failures are logged and tolerated, the row
    /// is the source of truth.
    pub async fn delete_file(&self, user_id: Uuid, file_id: Uuid) -> CoreResult<()> {
        let access = self.resolver.resolve(user_id, ResourceRef::File(file_id)).await?;
        if matches!(access, Access::None) {
            return Err(CoreError::not_found("file"));
        }

        let file = sqlx::query_as::<_, StoredFile>(
            "SELECT id, project_id, uploaded_by_id, name, key, url, content_type, size, created_at
             FROM files WHERE id = ?",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("file"))?;

        if file.uploaded_by_id != user_id && !access.can_delete() {
            return Err(CoreError::Forbidden(
                "only the uploader or an owner/admin can delete a file".into(),
            ));
        }

        let (head, _) = self.require_project_access(user_id, file.project_id).await?;

        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        if let Err(e) = self.storage.delete(file.key.clone()).await {
            tracing::warn!(key = %file.key, error = %e, "failed to delete blob for removed file");
        }

        self.log
            .record(NewActivity {
                workspace_id: head.workspace_id,
                user_id,
                action: ActivityAction::FileDeleted,
                description: format!("Deleted \"{}\" from \"{}\"", file.name, head.name),
                entity_id: Some(file_id),
                project_id: Some(file.project_id),
                client_id: Some(head.client_id),
                metadata: None,
            })
            .await;

        Ok(())
    }

    async fn require_project_access(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<(ProjectHead, Access)> {
        let access = self.resolver.resolve(user_id, ResourceRef::Project(project_id)).await?;
        if matches!(access, Access::None) {
            return Err(CoreError::not_found("project"));
        }
        let head: Option<(Uuid, Uuid, String)> = sqlx::query_as(
            "SELECT c.workspace_id, p.client_id, p.name
             FROM projects p JOIN clients c ON c.id = p.client_id
             WHERE p.id = ?",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        let (workspace_id, client_id, name) =
            head.ok_or_else(|| CoreError::not_found("project"))?;
        Ok((ProjectHead { workspace_id, client_id, name }, access))
    }
}

fn excerpt_of(content: &str) -> String {
    const MAX: usize = 140;
    if content.chars().count() <= MAX {
        return content.to_owned();
    }
    let cut: String = content.chars().take(MAX).collect();
    format!("{}...", cut.trim_end())
}
