#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use clientbay_core::db;
use clientbay_core::models::{
    CreateApprovalRequest, CreateClientRequest, CreateInvoiceRequest, CreateProjectRequest,
    CreateWorkspaceRequest, ItemInput, Workspace,
};
use clientbay_core::notify::{DeliveryFuture, Notification, NotificationQueue, NotificationSender};
use clientbay_core::services::{
    ActivityLog, ApprovalService, ClientService, ContentService, DashboardService, InvoiceService,
    ProjectService, ReportService, SearchService, UserService, WorkspaceService,
};
use clientbay_core::storage::MemoryBlobStore;

/// Sender that records every delivered notification for assertions.
#[derive(Clone, Default)]
pub struct RecordingSender {
    pub delivered: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSender for RecordingSender {
    fn deliver(&self, notification: Notification) -> DeliveryFuture {
        let delivered = Arc::clone(&self.delivered);
        Box::pin(async move {
            delivered.lock().expect("delivered lock").push(notification);
            Ok(())
        })
    }
}

pub struct TestCtx {
    pub pool: SqlitePool,
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
    pub blobs: MemoryBlobStore,
    pub delivered: Arc<Mutex<Vec<Notification>>>,
}

impl TestCtx {
    pub async fn new() -> Self {
        let pool = db::connect_memory().await.expect("in-memory pool");
        db::migrate(&pool).await.expect("migrate");

        let sender = RecordingSender::default();
        let delivered = Arc::clone(&sender.delivered);
        let queue = NotificationQueue::spawn(Arc::new(sender));
        let blobs = MemoryBlobStore::new();
        let activity = ActivityLog::new(pool.clone());

        Self {
            workspaces: WorkspaceService::new(pool.clone(), activity.clone()),
            clients: ClientService::new(pool.clone(), activity.clone()),
            projects: ProjectService::new(pool.clone(), activity.clone()),
            approvals: ApprovalService::new(pool.clone(), activity.clone(), queue.clone()),
            invoices: InvoiceService::new(pool.clone(), activity.clone(), queue.clone()),
            content: ContentService::new(
                pool.clone(),
                activity.clone(),
                queue,
                Arc::new(blobs.clone()),
            ),
            search: SearchService::new(pool.clone()),
            dashboard: DashboardService::new(pool.clone()),
            reports: ReportService::new(pool.clone()),
            users: UserService::new(pool.clone()),
            activity,
            blobs,
            delivered,
            pool,
        }
    }

    /// Insert a bare user row, the shape authentication would create.
    pub async fn user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(email)
            .bind(email.split('@').next().unwrap_or(email))
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .expect("insert user");
        id
    }

    /// A workspace owned by a fresh user. Returns (owner_id, workspace).
    pub async fn agency(&self, owner_email: &str, name: &str) -> (Uuid, Workspace) {
        let owner = self.user(owner_email).await;
        let workspace = self
            .workspaces
            .create(
                owner,
                CreateWorkspaceRequest {
                    name: name.to_owned(),
                    slug: name.to_lowercase().replace(' ', "-"),
                    brand_color: None,
                },
            )
            .await
            .expect("create workspace");
        (owner, workspace)
    }

    /// A client with one primary contact; returns (client_id, contact_user_id).
    pub async fn client_with_contact(
        &self,
        owner: Uuid,
        client_name: &str,
        contact_email: &str,
    ) -> (Uuid, Uuid) {
        let detail = self
            .clients
            .create(
                owner,
                CreateClientRequest {
                    name: client_name.to_owned(),
                    email: contact_email.to_owned(),
                    notes: None,
                },
            )
            .await
            .expect("create client");
        let contact_user = detail.contacts.first().expect("primary contact").user.id;
        (detail.client.id, contact_user)
    }

    pub async fn project(&self, owner: Uuid, client_id: Uuid, name: &str) -> Uuid {
        self.projects
            .create(
                owner,
                CreateProjectRequest {
                    client_id,
                    name: name.to_owned(),
                    description: None,
                    status: None,
                    start_date: None,
                    due_date: None,
                },
            )
            .await
            .expect("create project")
            .id
    }

    pub async fn approval(&self, owner: Uuid, project_id: Uuid, title: &str) -> Uuid {
        self.approvals
            .request(
                owner,
                CreateApprovalRequest {
                    project_id,
                    title: title.to_owned(),
                    description: None,
                },
            )
            .await
            .expect("create approval")
            .id
    }

    pub async fn invoice(&self, owner: Uuid, client_id: Uuid, items: Vec<(i64, i64)>) -> Uuid {
        self.invoices
            .create(
                owner,
                CreateInvoiceRequest {
                    client_id,
                    currency: None,
                    due_date: None,
                    items: items
                        .into_iter()
                        .enumerate()
                        .map(|(i, (quantity, unit_price))| ItemInput {
                            description: format!("Line {}", i + 1),
                            quantity,
                            unit_price,
                        })
                        .collect(),
                },
            )
            .await
            .expect("create invoice")
            .invoice
            .id
    }

    /// Wait for the notification worker to drain at least `count` entries.
    pub async fn wait_for_notifications(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            {
                let delivered = self.delivered.lock().expect("delivered lock");
                if delivered.len() >= count {
                    return delivered.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("notification worker did not deliver {count} notifications in time");
    }
}
