//! Invoice lifecycle and financial invariants.
//!
//! Money is integer minor units end to end. Totals are recomputed from the
//! item set inside the same transaction that writes the items, so readers
//! can never observe items without matching totals. Status transitions are
//! guarded UPDATEs keyed on the persisted status; `overdue` never hits the
//! database (see [`Invoice::display_status`]).

use chrono::Utc;
use garde::Validate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::access::{Access, AccessResolver, ResourceRef};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, CreateInvoiceRequest, Invoice, InvoiceDetail, InvoiceItem, InvoiceStatus,
    ItemInput, UpdateInvoiceRequest,
};
use crate::money;
use crate::notify::{Notification, NotificationQueue};
use crate::services::activity::{ActivityLog, NewActivity};

const INVOICE_COLUMNS: &str = "id, client_id, number, status, currency, subtotal, tax, total, \
                               due_date, sent_at, paid_at, created_at, updated_at";

/// A guarded status change. The WHERE clause names the legal source states;
/// `stamps` is how many timestamp placeholders precede the id placeholder.
struct Transition {
    sql: &'static str,
    stamps: usize,
    conflict: &'static str,
}

#[derive(Clone)]
pub struct InvoiceService {
    pool: SqlitePool,
    resolver: AccessResolver,
    log: ActivityLog,
    notifications: NotificationQueue,
}

impl InvoiceService {
    pub fn new(pool: SqlitePool, log: ActivityLog, notifications: NotificationQueue) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver, log, notifications }
    }

    /// Agency listing, newest first, with the derived display status.
    pub async fn list(&self, user_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let membership = self.resolver.require_membership(user_id).await?;
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT i.id, i.client_id, i.number, i.status, i.currency, i.subtotal, i.tax,
                    i.total, i.due_date, i.sent_at, i.paid_at, i.created_at, i.updated_at
             FROM invoices i
             JOIN clients c ON c.id = i.client_id
             WHERE c.workspace_id = ?
             ORDER BY i.created_at DESC",
        )
        .bind(membership.workspace_id)
        .fetch_all(&self.pool)
        .await?;
        let now = Utc::now();
        Ok(invoices.into_iter().map(|i| i.with_display_status(now)).collect())
    }

    /// Portal listing: non-draft invoices for every client the user is a
    /// contact for. Drafts are agency-internal.
    pub async fn list_for_contact(&self, user_id: Uuid) -> CoreResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT i.id, i.client_id, i.number, i.status, i.currency, i.subtotal, i.tax,
                    i.total, i.due_date, i.sent_at, i.paid_at, i.created_at, i.updated_at
             FROM invoices i
             JOIN client_contacts cc ON cc.client_id = i.client_id
             WHERE cc.user_id = ? AND i.status != 'draft'
             ORDER BY i.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let now = Utc::now();
        Ok(invoices.into_iter().map(|i| i.with_display_status(now)).collect())
    }

    /// Readable by either party; client-side readers never see drafts.
    pub async fn get(&self, user_id: Uuid, invoice_id: Uuid) -> CoreResult<InvoiceDetail> {
        let access = self.resolver.resolve(user_id, ResourceRef::Invoice(invoice_id)).await?;
        let invoice = match access {
            Access::Agency { .. } => self.fetch(invoice_id).await?,
            Access::ClientSide { .. } => {
                let invoice = self.fetch(invoice_id).await?;
                if invoice.status == InvoiceStatus::Draft {
                    return Err(CoreError::not_found("invoice"));
                }
                invoice
            }
            Access::None => return Err(CoreError::not_found("invoice")),
        };

        let client_name: String = sqlx::query_scalar("SELECT name FROM clients WHERE id = ?")
            .bind(invoice.client_id)
            .fetch_one(&self.pool)
            .await?;
        let items = self.items(invoice_id).await?;

        Ok(InvoiceDetail {
            invoice: invoice.with_display_status(Utc::now()),
            client_name,
            items,
        })
    }

    /// Create a draft. Requires at least one item; totals are computed from
    /// the items, never taken from the payload.
    pub async fn create(&self, user_id: Uuid, req: CreateInvoiceRequest) -> CoreResult<InvoiceDetail> {
        req.validate()?;
        let membership = self.resolver.require_membership(user_id).await?;

        let client: Option<(String,)> =
            sqlx::query_as("SELECT name FROM clients WHERE id = ? AND workspace_id = ?")
                .bind(req.client_id)
                .bind(membership.workspace_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some((client_name,)) = client else {
            return Err(CoreError::not_found("client"));
        };

        let subtotal = line_subtotal(&req.items)?;
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            client_id: req.client_id,
            number: generate_number(),
            status: InvoiceStatus::Draft,
            currency: req.currency.unwrap_or_else(|| "USD".to_owned()),
            subtotal,
            tax: 0,
            total: subtotal,
            due_date: req.due_date,
            sent_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO invoices
                 (id, client_id, number, status, currency, subtotal, tax, total,
                  due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice.id)
        .bind(invoice.client_id)
        .bind(&invoice.number)
        .bind(invoice.status)
        .bind(&invoice.currency)
        .bind(invoice.subtotal)
        .bind(invoice.tax)
        .bind(invoice.total)
        .bind(invoice.due_date)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;
        insert_items(&mut tx, invoice.id, &req.items).await?;
        tx.commit().await?;

        self.log
            .record(NewActivity {
                workspace_id: membership.workspace_id,
                user_id,
                action: ActivityAction::InvoiceCreated,
                description: format!("Created invoice {} for \"{client_name}\"", invoice.number),
                entity_id: Some(invoice.id),
                project_id: None,
                client_id: Some(invoice.client_id),
                metadata: None,
            })
            .await;

        let items = self.items(invoice.id).await?;
        Ok(InvoiceDetail { invoice, client_name, items })
    }

    /// Replace the item set and/or due date. Item replacement deletes the
    /// old rows, inserts the new ones, and recomputes both totals in one
    /// transaction; a partial state is never visible.
    ///
    /// Terminal invoices (`paid`, `cancelled`) are immutable.
    pub async fn update(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
        req: UpdateInvoiceRequest,
    ) -> CoreResult<InvoiceDetail> {
        req.validate()?;
        let access = self.resolver.resolve(user_id, ResourceRef::Invoice(invoice_id)).await?;
        let workspace_id = match access {
            Access::Agency { workspace_id, .. } => workspace_id,
            Access::ClientSide { .. } => {
                return Err(CoreError::Forbidden("clients cannot modify invoices".into()))
            }
            Access::None => return Err(CoreError::not_found("invoice")),
        };

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"
        ))
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await?;
        if matches!(current.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
            return Err(CoreError::Conflict(format!(
                "a {} invoice cannot be edited",
                current.status.as_str()
            )));
        }

        if let Some(items) = &req.items {
            let subtotal = line_subtotal(items)?;
            let total = subtotal
                .checked_add(current.tax)
                .ok_or_else(|| CoreError::Validation(vec![crate::error::FieldError {
                    field: "items".into(),
                    message: "total overflows".into(),
                }]))?;

            sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
                .bind(invoice_id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, invoice_id, items).await?;
            sqlx::query("UPDATE invoices SET subtotal = ?, total = ?, updated_at = ? WHERE id = ?")
                .bind(subtotal)
                .bind(total)
                .bind(Utc::now())
                .bind(invoice_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(due_date) = req.due_date {
            sqlx::query("UPDATE invoices SET due_date = ?, updated_at = ? WHERE id = ?")
                .bind(due_date)
                .bind(Utc::now())
                .bind(invoice_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::InvoiceUpdated,
                description: format!("Updated invoice {}", current.number),
                entity_id: Some(invoice_id),
                project_id: None,
                client_id: Some(current.client_id),
                metadata: None,
            })
            .await;

        self.get(user_id, invoice_id).await
    }

    /// `draft -> sent`. Anything else is a conflict, reported rather than
    /// silently ignored. Notifies the client's primary contact.
    pub async fn send(&self, user_id: Uuid, invoice_id: Uuid) -> CoreResult<Invoice> {
        let (invoice, workspace_id) = self
            .transition(
                user_id,
                invoice_id,
                Transition {
                    sql: "UPDATE invoices SET status = 'sent', sent_at = ?, updated_at = ? \
                          WHERE id = ? AND status = 'draft'",
                    stamps: 2,
                    conflict: "only a draft invoice can be sent",
                },
            )
            .await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::InvoiceSent,
                description: format!("Sent invoice {}", invoice.number),
                entity_id: Some(invoice.id),
                project_id: None,
                client_id: Some(invoice.client_id),
                metadata: None,
            })
            .await;

        let primary: Option<String> = sqlx::query_scalar(
            "SELECT u.email FROM client_contacts cc
             JOIN users u ON u.id = cc.user_id
             WHERE cc.client_id = ? AND cc.is_primary = 1",
        )
        .bind(invoice.client_id)
        .fetch_optional(&self.pool)
        .await?;
        match primary {
            Some(recipient) => self.notifications.enqueue(Notification::InvoiceSent {
                recipient,
                invoice_number: invoice.number.clone(),
                amount: money::format_minor(invoice.total, &invoice.currency),
            }),
            None => tracing::warn!(invoice = %invoice.number, "invoice sent with no primary contact to notify"),
        }

        Ok(invoice)
    }

    /// `sent -> paid`. A displayed `overdue` invoice is persisted as `sent`,
    /// so this also covers paying an overdue invoice.
    pub async fn mark_paid(&self, user_id: Uuid, invoice_id: Uuid) -> CoreResult<Invoice> {
        let (invoice, workspace_id) = self
            .transition(
                user_id,
                invoice_id,
                Transition {
                    sql: "UPDATE invoices SET status = 'paid', paid_at = ?, updated_at = ? \
                          WHERE id = ? AND status = 'sent'",
                    stamps: 2,
                    conflict: "only a sent invoice can be marked paid",
                },
            )
            .await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::InvoicePaid,
                description: format!("Marked invoice {} as paid", invoice.number),
                entity_id: Some(invoice.id),
                project_id: None,
                client_id: Some(invoice.client_id),
                metadata: None,
            })
            .await;

        Ok(invoice)
    }

    /// `draft -> cancelled` or `sent -> cancelled`.
    pub async fn cancel(&self, user_id: Uuid, invoice_id: Uuid) -> CoreResult<Invoice> {
        let (invoice, workspace_id) = self
            .transition(
                user_id,
                invoice_id,
                Transition {
                    sql: "UPDATE invoices SET status = 'cancelled', updated_at = ? \
                          WHERE id = ? AND status IN ('draft', 'sent')",
                    stamps: 1,
                    conflict: "only a draft or sent invoice can be cancelled",
                },
            )
            .await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::InvoiceCancelled,
                description: format!("Cancelled invoice {}", invoice.number),
                entity_id: Some(invoice.id),
                project_id: None,
                client_id: Some(invoice.client_id),
                metadata: None,
            })
            .await;

        Ok(invoice)
    }

    /// Destructive: owner/admin only. Items go with the invoice.
    pub async fn delete(&self, user_id: Uuid, invoice_id: Uuid) -> CoreResult<()> {
        let access = self.resolver.resolve(user_id, ResourceRef::Invoice(invoice_id)).await?;
        let workspace_id = match access {
            Access::Agency { workspace_id, .. } if access.can_delete() => workspace_id,
            Access::Agency { .. } => {
                return Err(CoreError::Forbidden(
                    "deleting an invoice requires an owner or admin role".into(),
                ))
            }
            _ => return Err(CoreError::not_found("invoice")),
        };

        let invoice = self.fetch(invoice_id).await?;
        sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(invoice_id)
            .execute(&self.pool)
            .await?;

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::InvoiceDeleted,
                description: format!("Deleted invoice {}", invoice.number),
                entity_id: Some(invoice_id),
                project_id: None,
                client_id: Some(invoice.client_id),
                metadata: None,
            })
            .await;

        Ok(())
    }

    /// Run a guarded status transition. The WHERE clause carries the legal
    /// source states; zero rows affected means the invoice is in some other
    /// state, which is a conflict, never a silent no-op.
    async fn transition(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
        transition: Transition,
    ) -> CoreResult<(Invoice, Uuid)> {
        let access = self.resolver.resolve(user_id, ResourceRef::Invoice(invoice_id)).await?;
        let workspace_id = match access {
            Access::Agency { workspace_id, .. } => workspace_id,
            Access::ClientSide { .. } => {
                return Err(CoreError::Forbidden("clients cannot modify invoices".into()))
            }
            Access::None => return Err(CoreError::not_found("invoice")),
        };

        let now = Utc::now();
        let mut query = sqlx::query(transition.sql);
        for _ in 0..transition.stamps {
            query = query.bind(now);
        }
        let result = query.bind(invoice_id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::Conflict(transition.conflict.to_owned()));
        }

        // Same derived-status mapping as the read paths, so a freshly sent
        // invoice with a past due date already reads as overdue.
        let invoice = self.fetch(invoice_id).await?.with_display_status(now);
        Ok((invoice, workspace_id))
    }

    async fn fetch(&self, invoice_id: Uuid) -> CoreResult<Invoice> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("invoice"))?;
        Ok(invoice)
    }

    async fn items(&self, invoice_id: Uuid) -> CoreResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT id, invoice_id, position, description, quantity, unit_price, total
             FROM invoice_items WHERE invoice_id = ? ORDER BY position ASC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

fn line_subtotal(items: &[ItemInput]) -> CoreResult<i64> {
    let mut subtotal: i64 = 0;
    for item in items {
        let line = item
            .quantity
            .checked_mul(item.unit_price)
            .and_then(|line| subtotal.checked_add(line));
        match line {
            Some(sum) => subtotal = sum,
            None => {
                return Err(CoreError::Validation(vec![crate::error::FieldError {
                    field: "items".into(),
                    message: "line totals overflow".into(),
                }]))
            }
        }
    }
    Ok(subtotal)
}

async fn insert_items(
    tx: &mut Transaction<'_, Sqlite>,
    invoice_id: Uuid,
    items: &[ItemInput],
) -> CoreResult<()> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO invoice_items
                 (id, invoice_id, position, description, quantity, unit_price, total)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(position as i64)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.line_total())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn generate_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("INV-{suffix}")
}
