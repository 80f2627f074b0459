use std::sync::Arc;

use clientbay_core::notify::{LogSender, NotificationQueue, NotificationSender};
use clientbay_core::services::{
    ActivityLog, ApprovalService, ClientService, ContentService, DashboardService, InvoiceService,
    ProjectService, ReportService, SearchService, UserService, WorkspaceService,
};
use clientbay_core::storage::{BlobStorage, MemoryBlobStore};
use sqlx::SqlitePool;

use crate::identity::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: JwtKeys,
    pub workspaces: WorkspaceService,
    pub clients: ClientService,
    pub projects: ProjectService,
    pub approvals: ApprovalService,
    pub invoices: InvoiceService,
    pub content: ContentService,
    pub search: SearchService,
    pub dashboard: DashboardService,
    pub reports: ReportService,
    pub users: UserService,
    pub activity: ActivityLog,
}

impl AppState {
    /// Wire every service off one pool. The default wiring uses the
    /// logging notification transport and the in-memory blob store;
    /// [`AppState::with_adapters`] swaps either.
    pub fn new(pool: SqlitePool, jwt: JwtKeys) -> Self {
        Self::with_adapters(pool, jwt, Arc::new(LogSender), Arc::new(MemoryBlobStore::new()))
    }

    pub fn with_adapters(
        pool: SqlitePool,
        jwt: JwtKeys,
        sender: Arc<dyn NotificationSender>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        let queue = NotificationQueue::spawn(sender);
        let activity = ActivityLog::new(pool.clone());
        Self {
            workspaces: WorkspaceService::new(pool.clone(), activity.clone()),
            clients: ClientService::new(pool.clone(), activity.clone()),
            projects: ProjectService::new(pool.clone(), activity.clone()),
            approvals: ApprovalService::new(pool.clone(), activity.clone(), queue.clone()),
            invoices: InvoiceService::new(pool.clone(), activity.clone(), queue.clone()),
            content: ContentService::new(pool.clone(), activity.clone(), queue, storage),
            search: SearchService::new(pool.clone()),
            dashboard: DashboardService::new(pool.clone()),
            reports: ReportService::new(pool.clone()),
            users: UserService::new(pool.clone()),
            activity,
            jwt,
            pool,
        }
    }
}
