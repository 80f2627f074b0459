//! Workspace dashboard rollups: entity counts, revenue by period, the
//! project pipeline, and recent activity volumes. Everything here is a
//! read over data owned by the caller's workspace.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::AccessResolver;
use crate::error::CoreResult;
use crate::models::ProjectStatus;

const DIGEST_LIMIT: i64 = 5;
const TREND_MONTHS: i32 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: OverviewStats,
    pub revenue: RevenueStats,
    pub invoices: InvoiceCounts,
    pub projects: ProjectPipeline,
    pub activity: EngagementCounts,
    pub recent_projects: Vec<ProjectDigest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_clients: i64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub completed_projects: i64,
    pub new_clients_this_month: i64,
    pub new_projects_this_month: i64,
}

/// Minor units throughout, same as the invoices they are summed from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    pub total: i64,
    pub this_month: i64,
    pub last_month: i64,
    pub this_year: i64,
    pub outstanding: i64,
    pub monthly_trend: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub month: String,
    pub year: i32,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCounts {
    pub total: i64,
    pub paid: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPipeline {
    pub by_status: Vec<StatusCount>,
    pub overdue_count: i64,
    pub upcoming_due_dates: Vec<ProjectDigest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementCounts {
    pub total_files: i64,
    pub total_messages: i64,
    pub total_approvals: i64,
    pub pending_approvals: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDigest {
    pub id: Uuid,
    pub name: String,
    pub client_name: String,
    pub status: ProjectStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DashboardService {
    pool: SqlitePool,
    resolver: AccessResolver,
}

impl DashboardService {
    pub fn new(pool: SqlitePool) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver }
    }

    /// Agency-side only, like search.
    pub async fn stats(&self, user_id: Uuid) -> CoreResult<DashboardStats> {
        let membership = self.resolver.require_membership(user_id).await?;
        let ws = membership.workspace_id;
        let now = Utc::now();
        let this_month = month_start(now, 0);

        let overview = OverviewStats {
            total_clients: self
                .count("SELECT COUNT(*) FROM clients WHERE workspace_id = ?", ws)
                .await?,
            total_projects: self.count(PROJECT_COUNT, ws).await?,
            active_projects: self
                .count(&format!("{PROJECT_COUNT} AND p.status = 'active'"), ws)
                .await?,
            completed_projects: self
                .count(&format!("{PROJECT_COUNT} AND p.status = 'completed'"), ws)
                .await?,
            new_clients_this_month: self
                .count_since(
                    "SELECT COUNT(*) FROM clients WHERE workspace_id = ? AND created_at >= ?",
                    ws,
                    this_month,
                )
                .await?,
            new_projects_this_month: self
                .count_since(&format!("{PROJECT_COUNT} AND p.created_at >= ?"), ws, this_month)
                .await?,
        };

        let revenue = self.revenue(ws, now).await?;

        let invoices = InvoiceCounts {
            total: self.count(INVOICE_COUNT, ws).await?,
            paid: self.count(&format!("{INVOICE_COUNT} AND i.status = 'paid'"), ws).await?,
            pending: self
                .count(&format!("{INVOICE_COUNT} AND i.status IN ('draft', 'sent')"), ws)
                .await?,
        };

        let by_status: Vec<(String, i64)> = sqlx::query_as(
            "SELECT p.status, COUNT(*) FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ?
             GROUP BY p.status",
        )
        .bind(ws)
        .fetch_all(&self.pool)
        .await?;
        let overdue_count = self
            .count_since(
                "SELECT COUNT(*) FROM projects p JOIN clients c ON c.id = p.client_id
                 WHERE c.workspace_id = ? AND p.status IN ('active', 'not-started')
                   AND p.due_date < ?",
                ws,
                now,
            )
            .await?;
        let upcoming_due_dates = sqlx::query_as::<_, ProjectDigest>(
            "SELECT p.id, p.name, c.name AS client_name, p.status, p.due_date, p.updated_at
             FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ? AND p.status IN ('active', 'not-started')
               AND p.due_date >= ?
             ORDER BY p.due_date ASC LIMIT ?",
        )
        .bind(ws)
        .bind(now)
        .bind(DIGEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let activity = EngagementCounts {
            total_files: self
                .count(
                    "SELECT COUNT(*) FROM files f
                     JOIN projects p ON p.id = f.project_id
                     JOIN clients c ON c.id = p.client_id
                     WHERE c.workspace_id = ?",
                    ws,
                )
                .await?,
            total_messages: self
                .count(
                    "SELECT COUNT(*) FROM messages m
                     JOIN projects p ON p.id = m.project_id
                     JOIN clients c ON c.id = p.client_id
                     WHERE c.workspace_id = ?",
                    ws,
                )
                .await?,
            total_approvals: self.count(APPROVAL_COUNT, ws).await?,
            pending_approvals: self
                .count(&format!("{APPROVAL_COUNT} AND a.status = 'pending'"), ws)
                .await?,
        };

        let recent_projects = sqlx::query_as::<_, ProjectDigest>(
            "SELECT p.id, p.name, c.name AS client_name, p.status, p.due_date, p.updated_at
             FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ?
             ORDER BY p.updated_at DESC LIMIT ?",
        )
        .bind(ws)
        .bind(DIGEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            overview,
            revenue,
            invoices,
            projects: ProjectPipeline {
                by_status: by_status
                    .into_iter()
                    .map(|(status, count)| StatusCount { status, count })
                    .collect(),
                overdue_count,
                upcoming_due_dates,
            },
            activity,
            recent_projects,
        })
    }

    /// Paid invoices are bucketed in Rust by their effective payment date
    /// (`paid_at`, falling back to `created_at` for rows imported without
    /// one). Period boundaries are half-open.
    async fn revenue(&self, workspace_id: Uuid, now: DateTime<Utc>) -> CoreResult<RevenueStats> {
        let paid: Vec<(i64, Option<DateTime<Utc>>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT i.total, i.paid_at, i.created_at FROM invoices i
             JOIN clients c ON c.id = i.client_id
             WHERE c.workspace_id = ? AND i.status = 'paid'",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        let paid: Vec<(i64, DateTime<Utc>)> = paid
            .into_iter()
            .map(|(total, paid_at, created_at)| (total, paid_at.unwrap_or(created_at)))
            .collect();

        let sum_between = |start: DateTime<Utc>, end: Option<DateTime<Utc>>| -> i64 {
            paid.iter()
                .filter(|(_, at)| *at >= start && end.map_or(true, |end| *at < end))
                .map(|(total, _)| total)
                .sum()
        };

        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(i.total), 0) FROM invoices i
             JOIN clients c ON c.id = i.client_id
             WHERE c.workspace_id = ? AND i.status IN ('draft', 'sent')",
        )
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await?;

        let monthly_trend = (0..TREND_MONTHS)
            .rev()
            .map(|back| {
                let start = month_start(now, -back);
                let end = month_start(now, -back + 1);
                MonthlyRevenue {
                    month: start.format("%b").to_string(),
                    year: start.year(),
                    revenue: sum_between(start, Some(end)),
                }
            })
            .collect();

        Ok(RevenueStats {
            total: paid.iter().map(|(total, _)| total).sum(),
            this_month: sum_between(month_start(now, 0), None),
            last_month: sum_between(month_start(now, -1), Some(month_start(now, 0))),
            this_year: sum_between(year_start(now), None),
            outstanding,
            monthly_trend,
        })
    }

    async fn count(&self, sql: &str, workspace_id: Uuid) -> CoreResult<i64> {
        Ok(sqlx::query_scalar(sql).bind(workspace_id).fetch_one(&self.pool).await?)
    }

    async fn count_since(
        &self,
        sql: &str,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> CoreResult<i64> {
        Ok(sqlx::query_scalar(sql)
            .bind(workspace_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?)
    }
}

const PROJECT_COUNT: &str = "SELECT COUNT(*) FROM projects p \
                             JOIN clients c ON c.id = p.client_id \
                             WHERE c.workspace_id = ?";
const INVOICE_COUNT: &str = "SELECT COUNT(*) FROM invoices i \
                             JOIN clients c ON c.id = i.client_id \
                             WHERE c.workspace_id = ?";
const APPROVAL_COUNT: &str = "SELECT COUNT(*) FROM approval_requests a \
                              JOIN projects p ON p.id = a.project_id \
                              JOIN clients c ON c.id = p.client_id \
                              WHERE c.workspace_id = ?";

/// First instant of the month `offset` months away from `anchor`'s month.
fn month_start(anchor: DateTime<Utc>, offset: i32) -> DateTime<Utc> {
    let months = anchor.year() as i64 * 12 + anchor.month0() as i64 + offset as i64;
    let year = months.div_euclid(12) as i32;
    let month = months.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| anchor.date_naive())
        .and_time(NaiveTime::MIN)
        .and_utc()
}

fn year_start(anchor: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(anchor.year(), 1, 1)
        .unwrap_or_else(|| anchor.date_naive())
        .and_time(NaiveTime::MIN)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_starts_wrap_across_year_boundaries() {
        let anchor = Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap();
        assert_eq!(month_start(anchor, 0), Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(month_start(anchor, -1), Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(month_start(anchor, -2), Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(month_start(anchor, 11), Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }
}
