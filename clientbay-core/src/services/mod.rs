pub mod activity;
pub mod approvals;
pub mod clients;
pub mod content;
pub mod dashboard;
pub mod invoices;
pub mod projects;
pub mod reports;
pub mod search;
pub mod users;
pub mod workspaces;

pub use activity::{ActivityFilter, ActivityLog, NewActivity};
pub use approvals::ApprovalService;
pub use clients::ClientService;
pub use content::ContentService;
pub use dashboard::{DashboardService, DashboardStats};
pub use invoices::InvoiceService;
pub use projects::ProjectService;
pub use reports::{Report, ReportQuery, ReportService, ReportType};
pub use search::{SearchFilter, SearchHit, SearchKind, SearchResults, SearchService};
pub use users::UserService;
pub use workspaces::WorkspaceService;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::CoreResult;

/// Find or create the user holding `email`. Users come into existence on
/// first reference — an invite or a contact creation — and may never have
/// authenticated.
pub(crate) async fn upsert_user_by_email(pool: &SqlitePool, email: &str) -> CoreResult<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)
         ON CONFLICT (email) DO UPDATE SET email = excluded.email
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(id)
}
