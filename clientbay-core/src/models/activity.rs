use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Entity association of an activity entry, carried explicitly alongside the
/// action code rather than re-derived by splitting the code string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Client,
    Project,
    Update,
    File,
    Approval,
    Message,
    Invoice,
    Member,
}

impl EntityKind {
    pub fn code(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Project => "project",
            EntityKind::Update => "update",
            EntityKind::File => "file",
            EntityKind::Approval => "approval",
            EntityKind::Message => "message",
            EntityKind::Invoice => "invoice",
            EntityKind::Member => "member",
        }
    }
}

/// Closed taxonomy of auditable actions. Each variant knows its entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityAction {
    ClientCreated,
    ClientUpdated,
    ClientDeleted,
    ProjectCreated,
    ProjectUpdated,
    ProjectStatusChanged,
    ProjectDeleted,
    UpdatePosted,
    FileUploaded,
    FileDeleted,
    ApprovalRequested,
    ApprovalApproved,
    ApprovalRejected,
    ApprovalChangesRequested,
    MessageSent,
    InvoiceCreated,
    InvoiceUpdated,
    InvoiceSent,
    InvoicePaid,
    InvoiceCancelled,
    InvoiceDeleted,
    MemberInvited,
    MemberRemoved,
}

impl ActivityAction {
    pub fn code(&self) -> &'static str {
        match self {
            ActivityAction::ClientCreated => "client.created",
            ActivityAction::ClientUpdated => "client.updated",
            ActivityAction::ClientDeleted => "client.deleted",
            ActivityAction::ProjectCreated => "project.created",
            ActivityAction::ProjectUpdated => "project.updated",
            ActivityAction::ProjectStatusChanged => "project.status_changed",
            ActivityAction::ProjectDeleted => "project.deleted",
            ActivityAction::UpdatePosted => "update.posted",
            ActivityAction::FileUploaded => "file.uploaded",
            ActivityAction::FileDeleted => "file.deleted",
            ActivityAction::ApprovalRequested => "approval.requested",
            ActivityAction::ApprovalApproved => "approval.approved",
            ActivityAction::ApprovalRejected => "approval.rejected",
            ActivityAction::ApprovalChangesRequested => "approval.changes_requested",
            ActivityAction::MessageSent => "message.sent",
            ActivityAction::InvoiceCreated => "invoice.created",
            ActivityAction::InvoiceUpdated => "invoice.updated",
            ActivityAction::InvoiceSent => "invoice.sent",
            ActivityAction::InvoicePaid => "invoice.paid",
            ActivityAction::InvoiceCancelled => "invoice.cancelled",
            ActivityAction::InvoiceDeleted => "invoice.deleted",
            ActivityAction::MemberInvited => "member.invited",
            ActivityAction::MemberRemoved => "member.removed",
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            ActivityAction::ClientCreated
            | ActivityAction::ClientUpdated
            | ActivityAction::ClientDeleted => EntityKind::Client,
            ActivityAction::ProjectCreated
            | ActivityAction::ProjectUpdated
            | ActivityAction::ProjectStatusChanged
            | ActivityAction::ProjectDeleted => EntityKind::Project,
            ActivityAction::UpdatePosted => EntityKind::Update,
            ActivityAction::FileUploaded | ActivityAction::FileDeleted => EntityKind::File,
            ActivityAction::ApprovalRequested
            | ActivityAction::ApprovalApproved
            | ActivityAction::ApprovalRejected
            | ActivityAction::ApprovalChangesRequested => EntityKind::Approval,
            ActivityAction::MessageSent => EntityKind::Message,
            ActivityAction::InvoiceCreated
            | ActivityAction::InvoiceUpdated
            | ActivityAction::InvoiceSent
            | ActivityAction::InvoicePaid
            | ActivityAction::InvoiceCancelled
            | ActivityAction::InvoiceDeleted => EntityKind::Invoice,
            ActivityAction::MemberInvited | ActivityAction::MemberRemoved => EntityKind::Member,
        }
    }
}

/// A persisted audit entry. Immutable once written.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_carries_its_entity_kind() {
        assert_eq!(ActivityAction::ProjectStatusChanged.entity_kind(), EntityKind::Project);
        assert_eq!(ActivityAction::ApprovalChangesRequested.entity_kind(), EntityKind::Approval);
        assert_eq!(ActivityAction::MemberRemoved.entity_kind(), EntityKind::Member);
        // The stored kind is independent of the code's prefix.
        assert_eq!(ActivityAction::UpdatePosted.code(), "update.posted");
        assert_eq!(ActivityAction::UpdatePosted.entity_kind().code(), "update");
    }
}
