//! Workspace reports: the same data the dashboard summarizes, sliced for
//! export. Four report types share one envelope; an optional date range
//! restricts every section to entities created inside it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::AccessResolver;
use crate::error::CoreResult;
use crate::models::ProjectStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Summary,
    Revenue,
    Projects,
    Clients,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(rename = "type", default)]
    pub report_type: ReportType,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub workspace: String,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub data: ReportData,
}

/// `None` on either side means unbounded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportData {
    Summary(SummaryReport),
    Revenue(RevenueReport),
    Projects(ProjectsReport),
    Clients(ClientsReport),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub overview: SummaryOverview,
    pub financial: SummaryFinancial,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOverview {
    pub total_clients: i64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub completed_projects: i64,
    pub total_invoices: i64,
    pub paid_invoices: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFinancial {
    pub total_revenue: i64,
    pub outstanding: i64,
    /// Mean paid-invoice total in minor units, zero when nothing is paid.
    pub average_invoice: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub number: String,
    pub client: String,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRevenue {
    pub client: String,
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub invoices: Vec<InvoiceLine>,
    pub by_client: Vec<ClientRevenue>,
    pub totals: RevenueTotals,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLine {
    pub name: String,
    pub client: String,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub updates: i64,
    pub files: i64,
    pub approvals: i64,
    pub messages: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsTotals {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub on_hold: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsReport {
    pub projects: Vec<ProjectLine>,
    pub by_status: BTreeMap<String, i64>,
    pub totals: ProjectsTotals,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientLine {
    pub name: String,
    pub primary_contact: String,
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_revenue: i64,
    pub outstanding: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsTotals {
    pub total_clients: i64,
    pub total_projects: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientsReport {
    pub clients: Vec<ClientLine>,
    pub totals: ClientsTotals,
}

#[derive(Clone)]
pub struct ReportService {
    pool: SqlitePool,
    resolver: AccessResolver,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver }
    }

    pub async fn generate(&self, user_id: Uuid, query: ReportQuery) -> CoreResult<Report> {
        let membership = self.resolver.require_membership(user_id).await?;
        let ws = membership.workspace_id;
        let range = (query.start_date, query.end_date);

        let data = match query.report_type {
            ReportType::Summary => ReportData::Summary(self.summary(ws, range).await?),
            ReportType::Revenue => ReportData::Revenue(self.revenue(ws, range).await?),
            ReportType::Projects => ReportData::Projects(self.projects(ws, range).await?),
            ReportType::Clients => ReportData::Clients(self.clients(ws, range).await?),
        };

        let workspace: String = sqlx::query_scalar("SELECT name FROM workspaces WHERE id = ?")
            .bind(ws)
            .fetch_one(&self.pool)
            .await?;

        Ok(Report {
            report_type: query.report_type,
            workspace,
            generated_at: Utc::now(),
            period: ReportPeriod { start: query.start_date, end: query.end_date },
            data,
        })
    }

    async fn summary(&self, ws: Uuid, range: DateRange) -> CoreResult<SummaryReport> {
        let project_statuses: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT p.status FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ? AND {}",
            in_range("p")
        ))
        .bind(ws)
        .bind(range.0)
        .bind(range.0)
        .bind(range.1)
        .bind(range.1)
        .fetch_all(&self.pool)
        .await?;

        let invoices: Vec<(i64, String)> = sqlx::query_as(&format!(
            "SELECT i.total, i.status FROM invoices i
             JOIN clients c ON c.id = i.client_id
             WHERE c.workspace_id = ? AND {}",
            in_range("i")
        ))
        .bind(ws)
        .bind(range.0)
        .bind(range.0)
        .bind(range.1)
        .bind(range.1)
        .fetch_all(&self.pool)
        .await?;

        let total_clients: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM clients c WHERE c.workspace_id = ? AND {}",
            in_range("c")
        ))
        .bind(ws)
        .bind(range.0)
        .bind(range.0)
        .bind(range.1)
        .bind(range.1)
        .fetch_one(&self.pool)
        .await?;

        let paid: Vec<i64> = invoices
            .iter()
            .filter(|(_, status)| status == "paid")
            .map(|(total, _)| *total)
            .collect();
        let total_revenue: i64 = paid.iter().sum();
        let outstanding = invoices
            .iter()
            .filter(|(_, status)| status != "paid")
            .map(|(total, _)| total)
            .sum();

        Ok(SummaryReport {
            overview: SummaryOverview {
                total_clients,
                total_projects: project_statuses.len() as i64,
                active_projects: count_status(&project_statuses, "active"),
                completed_projects: count_status(&project_statuses, "completed"),
                total_invoices: invoices.len() as i64,
                paid_invoices: paid.len() as i64,
            },
            financial: SummaryFinancial {
                total_revenue,
                outstanding,
                average_invoice: if paid.is_empty() { 0 } else { total_revenue / paid.len() as i64 },
            },
        })
    }

    async fn revenue(&self, ws: Uuid, range: DateRange) -> CoreResult<RevenueReport> {
        let invoices = sqlx::query_as::<_, InvoiceLine>(&format!(
            "SELECT i.number, c.name AS client, i.total AS amount, i.status,
                    i.created_at, i.paid_at
             FROM invoices i
             JOIN clients c ON c.id = i.client_id
             WHERE c.workspace_id = ? AND {}
             ORDER BY i.created_at DESC",
            in_range("i")
        ))
        .bind(ws)
        .bind(range.0)
        .bind(range.0)
        .bind(range.1)
        .bind(range.1)
        .fetch_all(&self.pool)
        .await?;

        let mut by_client: BTreeMap<String, ClientRevenue> = BTreeMap::new();
        for invoice in &invoices {
            let entry = by_client.entry(invoice.client.clone()).or_insert_with(|| ClientRevenue {
                client: invoice.client.clone(),
                total: 0,
                paid: 0,
                pending: 0,
                count: 0,
            });
            entry.total += invoice.amount;
            entry.count += 1;
            if invoice.status == "paid" {
                entry.paid += invoice.amount;
            } else {
                entry.pending += invoice.amount;
            }
        }

        let paid: i64 =
            invoices.iter().filter(|i| i.status == "paid").map(|i| i.amount).sum();
        let total: i64 = invoices.iter().map(|i| i.amount).sum();

        Ok(RevenueReport {
            by_client: by_client.into_values().collect(),
            totals: RevenueTotals { total, paid, pending: total - paid },
            invoices,
        })
    }

    async fn projects(&self, ws: Uuid, range: DateRange) -> CoreResult<ProjectsReport> {
        type Row = (
            String,
            String,
            ProjectStatus,
            Option<DateTime<Utc>>,
            Option<DateTime<Utc>>,
            i64,
            i64,
            i64,
            i64,
        );
        let rows: Vec<Row> = sqlx::query_as(&format!(
            "SELECT p.name, c.name, p.status, p.start_date, p.due_date,
                    (SELECT COUNT(*) FROM project_updates u WHERE u.project_id = p.id),
                    (SELECT COUNT(*) FROM files f WHERE f.project_id = p.id),
                    (SELECT COUNT(*) FROM approval_requests a WHERE a.project_id = p.id),
                    (SELECT COUNT(*) FROM messages m WHERE m.project_id = p.id)
             FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ? AND {}
             ORDER BY p.created_at DESC",
            in_range("p")
        ))
        .bind(ws)
        .bind(range.0)
        .bind(range.0)
        .bind(range.1)
        .bind(range.1)
        .fetch_all(&self.pool)
        .await?;

        let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
        let mut totals = ProjectsTotals { total: rows.len() as i64, active: 0, completed: 0, on_hold: 0 };
        for (_, _, status, ..) in &rows {
            *by_status.entry(status.as_str().to_owned()).or_insert(0) += 1;
            match status {
                ProjectStatus::Active => totals.active += 1,
                ProjectStatus::Completed => totals.completed += 1,
                ProjectStatus::OnHold => totals.on_hold += 1,
                _ => {}
            }
        }

        let projects = rows
            .into_iter()
            .map(|(name, client, status, start_date, due_date, updates, files, approvals, messages)| {
                ProjectLine {
                    name,
                    client,
                    status: status.label().to_owned(),
                    start_date,
                    due_date,
                    updates,
                    files,
                    approvals,
                    messages,
                }
            })
            .collect();

        Ok(ProjectsReport { projects, by_status, totals })
    }

    async fn clients(&self, ws: Uuid, range: DateRange) -> CoreResult<ClientsReport> {
        let clients = sqlx::query_as::<_, ClientLine>(&format!(
            "SELECT c.name,
                    COALESCE((SELECT u.email FROM client_contacts cc
                              JOIN users u ON u.id = cc.user_id
                              WHERE cc.client_id = c.id AND cc.is_primary = 1), '-')
                        AS primary_contact,
                    (SELECT COUNT(*) FROM projects p WHERE p.client_id = c.id)
                        AS total_projects,
                    (SELECT COUNT(*) FROM projects p
                     WHERE p.client_id = c.id AND p.status = 'active')
                        AS active_projects,
                    COALESCE((SELECT SUM(i.total) FROM invoices i
                              WHERE i.client_id = c.id AND i.status = 'paid'), 0)
                        AS total_revenue,
                    COALESCE((SELECT SUM(i.total) FROM invoices i
                              WHERE i.client_id = c.id AND i.status != 'paid'), 0)
                        AS outstanding,
                    c.created_at
             FROM clients c
             WHERE c.workspace_id = ? AND {}
             ORDER BY c.created_at DESC",
            in_range("c")
        ))
        .bind(ws)
        .bind(range.0)
        .bind(range.0)
        .bind(range.1)
        .bind(range.1)
        .fetch_all(&self.pool)
        .await?;

        let totals = ClientsTotals {
            total_clients: clients.len() as i64,
            total_projects: clients.iter().map(|c| c.total_projects).sum(),
            total_revenue: clients.iter().map(|c| c.total_revenue).sum(),
        };

        Ok(ClientsReport { clients, totals })
    }
}

type DateRange = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// Optional-bound filter on `created_at`. Always binds four parameters:
/// start twice, then end twice.
fn in_range(alias: &str) -> String {
    format!(
        "(? IS NULL OR {alias}.created_at >= ?) AND (? IS NULL OR {alias}.created_at <= ?)"
    )
}

fn count_status(statuses: &[(String,)], wanted: &str) -> i64 {
    statuses.iter().filter(|(status,)| status == wanted).count() as i64
}
