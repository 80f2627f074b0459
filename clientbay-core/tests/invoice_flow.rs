mod common;

use chrono::{Duration, Utc};
use clientbay_core::error::CoreError;
use clientbay_core::models::{InvoiceStatus, ItemInput, UpdateInvoiceRequest};
use clientbay_core::notify::Notification;
use common::TestCtx;

#[tokio::test]
async fn totals_come_from_the_items_not_the_payload() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;

    let invoice_id = ctx.invoice(owner, client_id, vec![(2, 5000), (1, 2500)]).await;
    let detail = ctx.invoices.get(owner, invoice_id).await.unwrap();

    assert_eq!(detail.invoice.status, InvoiceStatus::Draft);
    assert_eq!(detail.invoice.subtotal, 12_500);
    assert_eq!(detail.invoice.total, 12_500);
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.items[0].total, 10_000);
    assert!(detail.invoice.number.starts_with("INV-"), "got {}", detail.invoice.number);
}

#[tokio::test]
async fn drafts_are_invisible_to_the_portal() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;

    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 9900)]).await;
    assert!(ctx.invoices.list_for_contact(contact).await.unwrap().is_empty());
    let err = ctx.invoices.get(contact, invoice_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");

    ctx.invoices.send(owner, invoice_id).await.unwrap();
    let visible = ctx.invoices.list_for_contact(contact).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn the_lifecycle_is_draft_sent_paid_with_no_shortcuts() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 10_000)]).await;

    // Paying a draft is refused.
    let err = ctx.invoices.mark_paid(owner, invoice_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");

    let sent = ctx.invoices.send(owner, invoice_id).await.unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);
    assert!(sent.sent_at.is_some());

    // Sending twice is refused.
    let err = ctx.invoices.send(owner, invoice_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");

    let paid = ctx.invoices.mark_paid(owner, invoice_id).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(paid.paid_at.is_some());

    // Paid is terminal.
    let err = ctx.invoices.cancel(owner, invoice_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");

    let notification = ctx.wait_for_notifications(1).await;
    assert!(
        matches!(
            &notification[0],
            Notification::InvoiceSent { recipient, amount, .. }
                if recipient == "c@acme.test" && amount == "$100.00"
        ),
        "got {notification:?}"
    );
}

#[tokio::test]
async fn item_replacement_recomputes_totals_atomically() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(2, 5000)]).await;

    let detail = ctx
        .invoices
        .update(
            owner,
            invoice_id,
            UpdateInvoiceRequest {
                due_date: None,
                items: Some(vec![
                    ItemInput { description: "Design".into(), quantity: 3, unit_price: 4000 },
                    ItemInput { description: "Hosting".into(), quantity: 1, unit_price: 1500 },
                ]),
            },
        )
        .await
        .unwrap();

    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.invoice.subtotal, 13_500);
    assert_eq!(detail.invoice.total, 13_500);

    // No stale rows survive the replacement.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_items WHERE invoice_id = ?")
        .bind(invoice_id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn terminal_invoices_cannot_be_edited() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 100)]).await;

    ctx.invoices.cancel(owner, invoice_id).await.unwrap();

    let err = ctx
        .invoices
        .update(
            owner,
            invoice_id,
            UpdateInvoiceRequest {
                due_date: None,
                items: Some(vec![ItemInput {
                    description: "New".into(),
                    quantity: 1,
                    unit_price: 1,
                }]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn the_due_date_can_be_set_and_cleared() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 5000)]).await;

    let due = Utc::now() + Duration::days(30);
    let detail = ctx
        .invoices
        .update(
            owner,
            invoice_id,
            UpdateInvoiceRequest { due_date: Some(Some(due)), items: None },
        )
        .await
        .unwrap();
    assert!(detail.invoice.due_date.is_some());

    // An absent field leaves the date alone.
    let detail = ctx
        .invoices
        .update(owner, invoice_id, UpdateInvoiceRequest { due_date: None, items: None })
        .await
        .unwrap();
    assert!(detail.invoice.due_date.is_some());

    // An explicit null clears it.
    let detail = ctx
        .invoices
        .update(
            owner,
            invoice_id,
            UpdateInvoiceRequest { due_date: Some(None), items: None },
        )
        .await
        .unwrap();
    assert!(detail.invoice.due_date.is_none());
}

#[tokio::test]
async fn sending_past_the_due_date_reports_overdue_immediately() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 5000)]).await;

    ctx.invoices
        .update(
            owner,
            invoice_id,
            UpdateInvoiceRequest {
                due_date: Some(Some(Utc::now() - Duration::days(3))),
                items: None,
            },
        )
        .await
        .unwrap();

    let sent = ctx.invoices.send(owner, invoice_id).await.unwrap();
    assert_eq!(sent.status, InvoiceStatus::Overdue);
    assert!(sent.sent_at.is_some());
}

#[tokio::test]
async fn a_sent_invoice_past_due_reads_as_overdue() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 5000)]).await;
    ctx.invoices.send(owner, invoice_id).await.unwrap();

    sqlx::query("UPDATE invoices SET due_date = ? WHERE id = ?")
        .bind(Utc::now() - Duration::days(3))
        .bind(invoice_id)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let detail = ctx.invoices.get(owner, invoice_id).await.unwrap();
    assert_eq!(detail.invoice.status, InvoiceStatus::Overdue);

    // The persisted row still says sent, so payment is legal.
    let paid = ctx.invoices.mark_paid(owner, invoice_id).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn contacts_cannot_drive_the_lifecycle() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let invoice_id = ctx.invoice(owner, client_id, vec![(1, 5000)]).await;
    ctx.invoices.send(owner, invoice_id).await.unwrap();

    let err = ctx.invoices.mark_paid(contact, invoice_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");

    let err = ctx.invoices.cancel(contact, invoice_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");
}
