//! Approval request workflow.
//!
//! `pending` is the only state that accepts a response; the transition is a
//! guarded UPDATE so two concurrent responses cannot both win, and the loser
//! gets `Conflict` with nothing overwritten.

use chrono::Utc;
use garde::Validate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::{Access, AccessResolver, ResourceRef};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, ApprovalDecision, ApprovalRequest, ApprovalStatus, CreateApprovalRequest,
    RespondRequest,
};
use crate::notify::{Notification, NotificationQueue};
use crate::services::activity::{ActivityLog, NewActivity};

const APPROVAL_COLUMNS: &str = "id, project_id, requested_by_id, title, description, status, \
                                response_note, responded_by_id, responded_at, created_at";

#[derive(Clone)]
pub struct ApprovalService {
    pool: SqlitePool,
    resolver: AccessResolver,
    log: ActivityLog,
    notifications: NotificationQueue,
}

impl ApprovalService {
    pub fn new(pool: SqlitePool, log: ActivityLog, notifications: NotificationQueue) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver, log, notifications }
    }

    /// Readable by either party with access to the owning project.
    pub async fn list_for_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<Vec<ApprovalRequest>> {
        let access = self.resolver.resolve(user_id, ResourceRef::Project(project_id)).await?;
        if access == Access::None {
            return Err(CoreError::not_found("project"));
        }
        let approvals = sqlx::query_as::<_, ApprovalRequest>(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approval_requests
             WHERE project_id = ? ORDER BY created_at DESC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(approvals)
    }

    pub async fn get(&self, user_id: Uuid, approval_id: Uuid) -> CoreResult<ApprovalRequest> {
        let access = self.resolver.resolve(user_id, ResourceRef::Approval(approval_id)).await?;
        if access == Access::None {
            return Err(CoreError::not_found("approval"));
        }
        let approval = sqlx::query_as::<_, ApprovalRequest>(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approval_requests WHERE id = ?"
        ))
        .bind(approval_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(approval)
    }

    /// Portal view: pending approvals across every client the user is a
    /// contact for.
    pub async fn pending_for_contact(&self, user_id: Uuid) -> CoreResult<Vec<ApprovalRequest>> {
        let approvals = sqlx::query_as::<_, ApprovalRequest>(
            "SELECT a.id, a.project_id, a.requested_by_id, a.title, a.description, a.status,
                    a.response_note, a.responded_by_id, a.responded_at, a.created_at
             FROM approval_requests a
             JOIN projects p ON p.id = a.project_id
             JOIN client_contacts cc ON cc.client_id = p.client_id
             WHERE cc.user_id = ? AND a.status = 'pending'
             ORDER BY a.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(approvals)
    }

    /// Agency-side: open a request in `pending` and fan a notification out
    /// to every contact of the owning client.
    pub async fn request(
        &self,
        user_id: Uuid,
        req: CreateApprovalRequest,
    ) -> CoreResult<ApprovalRequest> {
        req.validate()?;
        let membership = self.resolver.require_membership(user_id).await?;

        let scoped: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT p.client_id, p.name
             FROM projects p JOIN clients c ON c.id = p.client_id
             WHERE p.id = ? AND c.workspace_id = ?",
        )
        .bind(req.project_id)
        .bind(membership.workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some((client_id, project_name)) = scoped else {
            return Err(CoreError::not_found("project"));
        };

        let approval = ApprovalRequest {
            id: Uuid::new_v4(),
            project_id: req.project_id,
            requested_by_id: user_id,
            title: req.title,
            description: req.description,
            status: ApprovalStatus::Pending,
            response_note: None,
            responded_by_id: None,
            responded_at: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO approval_requests
                 (id, project_id, requested_by_id, title, description, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(approval.id)
        .bind(approval.project_id)
        .bind(approval.requested_by_id)
        .bind(&approval.title)
        .bind(&approval.description)
        .bind(approval.status)
        .bind(approval.created_at)
        .execute(&self.pool)
        .await?;

        self.log
            .record(NewActivity {
                workspace_id: membership.workspace_id,
                user_id,
                action: ActivityAction::ApprovalRequested,
                description: format!("Requested approval \"{}\"", approval.title),
                entity_id: Some(approval.id),
                project_id: Some(approval.project_id),
                client_id: Some(client_id),
                metadata: None,
            })
            .await;

        let requester_email: Option<String> =
            sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let contact_emails: Vec<String> = sqlx::query_scalar(
            "SELECT u.email FROM client_contacts cc
             JOIN users u ON u.id = cc.user_id
             WHERE cc.client_id = ?",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        for recipient in contact_emails {
            self.notifications.enqueue(Notification::ApprovalRequested {
                recipient,
                approval_title: approval.title.clone(),
                project_name: project_name.clone(),
                requested_by: requester_email.clone().unwrap_or_default(),
            });
        }

        Ok(approval)
    }

    /// Client-side response. Access is re-resolved here, at response time:
    /// whatever was true when the request was created does not matter if the
    /// project has since been deleted or moved.
    pub async fn respond(
        &self,
        user_id: Uuid,
        approval_id: Uuid,
        req: RespondRequest,
    ) -> CoreResult<ApprovalRequest> {
        req.validate()?;

        // A direct approval link already implies existence, so a caller with
        // no client-side access gets Forbidden here, not NotFound.
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM approval_requests WHERE id = ?")
                .bind(approval_id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(CoreError::not_found("approval"));
        }

        let access = self.resolver.resolve(user_id, ResourceRef::Approval(approval_id)).await?;
        let (workspace_id, client_id) = match access {
            Access::ClientSide { workspace_id, client_id } => (workspace_id, client_id),
            _ => {
                return Err(CoreError::Forbidden(
                    "only a contact of the client can respond to this approval".into(),
                ))
            }
        };

        let status = ApprovalStatus::from(req.status);
        let now = Utc::now();
        let updated = sqlx::query(
            "UPDATE approval_requests
             SET status = ?, response_note = ?, responded_by_id = ?, responded_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(&req.response_note)
        .bind(user_id)
        .bind(now)
        .bind(approval_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(CoreError::Conflict(
                "this approval has already been responded to".into(),
            ));
        }

        let approval = sqlx::query_as::<_, ApprovalRequest>(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approval_requests WHERE id = ?"
        ))
        .bind(approval_id)
        .fetch_one(&self.pool)
        .await?;

        let action = match req.status {
            ApprovalDecision::Approved => ActivityAction::ApprovalApproved,
            ApprovalDecision::ChangesRequested => ActivityAction::ApprovalChangesRequested,
            ApprovalDecision::Rejected => ActivityAction::ApprovalRejected,
        };
        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action,
                description: format!("Responded to approval \"{}\"", approval.title),
                entity_id: Some(approval.id),
                project_id: Some(approval.project_id),
                client_id: Some(client_id),
                metadata: None,
            })
            .await;

        let requester_email: Option<String> =
            sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
                .bind(approval.requested_by_id)
                .fetch_optional(&self.pool)
                .await?;
        let responder_email: Option<String> =
            sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        if let Some(recipient) = requester_email {
            self.notifications.enqueue(Notification::ApprovalResponded {
                recipient,
                approval_title: approval.title.clone(),
                status,
                responded_by: responder_email.unwrap_or_default(),
            });
        }

        Ok(approval)
    }
}
