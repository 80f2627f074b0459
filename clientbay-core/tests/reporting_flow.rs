mod common;

use chrono::{Duration, Utc};
use clientbay_core::error::CoreError;
use clientbay_core::models::{ProjectStatus, UpdateProjectRequest};
use clientbay_core::services::reports::ReportData;
use clientbay_core::services::{ReportQuery, ReportType};
use common::TestCtx;

async fn set_status(ctx: &TestCtx, owner: uuid::Uuid, project_id: uuid::Uuid, status: ProjectStatus) {
    ctx.projects
        .update(
            owner,
            project_id,
            UpdateProjectRequest {
                name: None,
                description: None,
                status: Some(status),
                start_date: None,
                due_date: None,
            },
        )
        .await
        .expect("set status");
}

#[tokio::test]
async fn dashboard_counts_reflect_workspace_contents() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let website = ctx.project(owner, client_id, "Website").await;
    let branding = ctx.project(owner, client_id, "Branding").await;
    set_status(&ctx, owner, website, ProjectStatus::Active).await;
    set_status(&ctx, owner, branding, ProjectStatus::Completed).await;
    ctx.approval(owner, website, "Homepage sign-off").await;

    let paid_invoice = ctx.invoice(owner, client_id, vec![(1, 40_000)]).await;
    ctx.invoices.send(owner, paid_invoice).await.unwrap();
    ctx.invoices.mark_paid(owner, paid_invoice).await.unwrap();
    ctx.invoice(owner, client_id, vec![(1, 15_000)]).await;

    let stats = ctx.dashboard.stats(owner).await.unwrap();

    assert_eq!(stats.overview.total_clients, 1);
    assert_eq!(stats.overview.total_projects, 2);
    assert_eq!(stats.overview.active_projects, 1);
    assert_eq!(stats.overview.completed_projects, 1);
    assert_eq!(stats.overview.new_clients_this_month, 1);
    assert_eq!(stats.overview.new_projects_this_month, 2);

    assert_eq!(stats.invoices.total, 2);
    assert_eq!(stats.invoices.paid, 1);
    assert_eq!(stats.invoices.pending, 1);

    assert_eq!(stats.revenue.total, 40_000);
    assert_eq!(stats.revenue.this_month, 40_000);
    assert_eq!(stats.revenue.outstanding, 15_000);
    assert_eq!(stats.revenue.monthly_trend.len(), 6);
    assert_eq!(stats.revenue.monthly_trend[5].revenue, 40_000);

    assert_eq!(stats.activity.total_approvals, 1);
    assert_eq!(stats.activity.pending_approvals, 1);
    assert_eq!(stats.recent_projects.len(), 2);
    assert_eq!(stats.recent_projects[0].client_name, "Acme");
}

#[tokio::test]
async fn dashboard_upcoming_and_overdue_projects_split_on_now() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let late = ctx.project(owner, client_id, "Late").await;
    let soon = ctx.project(owner, client_id, "Soon").await;

    for (id, days) in [(late, -5i64), (soon, 5)] {
        sqlx::query("UPDATE projects SET due_date = ? WHERE id = ?")
            .bind(Utc::now() + Duration::days(days))
            .bind(id)
            .execute(&ctx.pool)
            .await
            .unwrap();
    }

    let stats = ctx.dashboard.stats(owner).await.unwrap();
    assert_eq!(stats.projects.overdue_count, 1);
    assert_eq!(stats.projects.upcoming_due_dates.len(), 1);
    assert_eq!(stats.projects.upcoming_due_dates[0].name, "Soon");
}

#[tokio::test]
async fn dashboard_is_scoped_and_agency_side_only() {
    let ctx = TestCtx::new().await;
    let (owner_a, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_a, contact) = ctx.client_with_contact(owner_a, "Acme", "c@acme.test").await;
    ctx.project(owner_a, client_a, "Website").await;

    let (owner_b, _) = ctx.agency("b@beta.test", "Beta").await;
    let stats = ctx.dashboard.stats(owner_b).await.unwrap();
    assert_eq!(stats.overview.total_clients, 0);
    assert_eq!(stats.overview.total_projects, 0);

    let err = ctx.dashboard.stats(contact).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn the_summary_report_rolls_up_counts_and_money() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    ctx.project(owner, client_id, "Website").await;

    let paid = ctx.invoice(owner, client_id, vec![(1, 30_000)]).await;
    ctx.invoices.send(owner, paid).await.unwrap();
    ctx.invoices.mark_paid(owner, paid).await.unwrap();
    ctx.invoice(owner, client_id, vec![(1, 12_000)]).await;

    let report = ctx.reports.generate(owner, ReportQuery::default()).await.unwrap();
    assert_eq!(report.report_type, ReportType::Summary);
    assert_eq!(report.workspace, "Alpha");

    let ReportData::Summary(data) = report.data else {
        panic!("expected a summary report");
    };
    assert_eq!(data.overview.total_clients, 1);
    assert_eq!(data.overview.total_invoices, 2);
    assert_eq!(data.overview.paid_invoices, 1);
    assert_eq!(data.financial.total_revenue, 30_000);
    assert_eq!(data.financial.outstanding, 12_000);
    assert_eq!(data.financial.average_invoice, 30_000);
}

#[tokio::test]
async fn the_revenue_report_groups_invoices_by_client() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (acme, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let (zen, _) = ctx.client_with_contact(owner, "Zen Co", "z@zen.test").await;

    let paid = ctx.invoice(owner, acme, vec![(1, 50_000)]).await;
    ctx.invoices.send(owner, paid).await.unwrap();
    ctx.invoices.mark_paid(owner, paid).await.unwrap();
    ctx.invoice(owner, acme, vec![(1, 10_000)]).await;
    ctx.invoice(owner, zen, vec![(1, 7_500)]).await;

    let report = ctx
        .reports
        .generate(owner, ReportQuery { report_type: ReportType::Revenue, ..Default::default() })
        .await
        .unwrap();
    let ReportData::Revenue(data) = report.data else {
        panic!("expected a revenue report");
    };

    assert_eq!(data.invoices.len(), 3);
    assert_eq!(data.totals.total, 67_500);
    assert_eq!(data.totals.paid, 50_000);
    assert_eq!(data.totals.pending, 17_500);

    assert_eq!(data.by_client.len(), 2);
    let acme_row = &data.by_client[0];
    assert_eq!(acme_row.client, "Acme");
    assert_eq!(acme_row.total, 60_000);
    assert_eq!(acme_row.paid, 50_000);
    assert_eq!(acme_row.pending, 10_000);
    assert_eq!(acme_row.count, 2);
}

#[tokio::test]
async fn the_projects_report_carries_engagement_counts() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;
    ctx.approval(owner, project_id, "Homepage sign-off").await;

    let report = ctx
        .reports
        .generate(owner, ReportQuery { report_type: ReportType::Projects, ..Default::default() })
        .await
        .unwrap();
    let ReportData::Projects(data) = report.data else {
        panic!("expected a projects report");
    };

    assert_eq!(data.projects.len(), 1);
    let line = &data.projects[0];
    assert_eq!(line.name, "Website");
    assert_eq!(line.client, "Acme");
    assert_eq!(line.status, "Not Started");
    assert_eq!(line.approvals, 1);
    assert_eq!(line.messages, 0);

    assert_eq!(data.by_status.get("not-started"), Some(&1));
    assert_eq!(data.totals.total, 1);
    assert_eq!(data.totals.active, 0);
}

#[tokio::test]
async fn the_clients_report_sums_revenue_per_client() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    ctx.project(owner, client_id, "Website").await;
    let paid = ctx.invoice(owner, client_id, vec![(1, 20_000)]).await;
    ctx.invoices.send(owner, paid).await.unwrap();
    ctx.invoices.mark_paid(owner, paid).await.unwrap();
    ctx.invoice(owner, client_id, vec![(1, 5_000)]).await;

    let report = ctx
        .reports
        .generate(owner, ReportQuery { report_type: ReportType::Clients, ..Default::default() })
        .await
        .unwrap();
    let ReportData::Clients(data) = report.data else {
        panic!("expected a clients report");
    };

    assert_eq!(data.clients.len(), 1);
    let line = &data.clients[0];
    assert_eq!(line.name, "Acme");
    assert_eq!(line.primary_contact, "c@acme.test");
    assert_eq!(line.total_projects, 1);
    assert_eq!(line.total_revenue, 20_000);
    assert_eq!(line.outstanding, 5_000);
    assert_eq!(data.totals.total_revenue, 20_000);
}

#[tokio::test]
async fn the_date_range_excludes_entities_created_outside_it() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let old_invoice = ctx.invoice(owner, client_id, vec![(1, 9_000)]).await;
    ctx.invoice(owner, client_id, vec![(1, 4_000)]).await;

    sqlx::query("UPDATE invoices SET created_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::days(90))
        .bind(old_invoice)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let report = ctx
        .reports
        .generate(
            owner,
            ReportQuery {
                report_type: ReportType::Revenue,
                start_date: Some(Utc::now() - Duration::days(7)),
                end_date: None,
            },
        )
        .await
        .unwrap();
    let ReportData::Revenue(data) = report.data else {
        panic!("expected a revenue report");
    };
    assert_eq!(data.invoices.len(), 1);
    assert_eq!(data.totals.total, 4_000);
    assert!(report.period.start.is_some());
}

#[tokio::test]
async fn reports_require_a_workspace_membership() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (_, contact) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;

    let err = ctx.reports.generate(contact, ReportQuery::default()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
}
