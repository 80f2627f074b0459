use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `Pending` is the only non-terminal state. Once a response lands the
/// request never transitions again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    ChangesRequested,
    Rejected,
}

/// The three legal responses. Separate from [`ApprovalStatus`] so a payload
/// can never name `pending` as a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalDecision {
    Approved,
    ChangesRequested,
    Rejected,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::ChangesRequested => ApprovalStatus::ChangesRequested,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub project_id: Uuid,
    pub requested_by_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: ApprovalStatus,
    pub response_note: Option<String>,
    pub responded_by_id: Option<Uuid>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApprovalRequest {
    #[garde(skip)]
    pub project_id: Uuid,
    #[garde(length(min = 1, max = 200))]
    pub title: String,
    #[garde(skip)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    #[garde(skip)]
    pub status: ApprovalDecision,
    #[garde(length(max = 2000))]
    pub response_note: Option<String>,
}
