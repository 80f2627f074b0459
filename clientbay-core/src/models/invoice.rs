use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted invoice states. `Overdue` is never written to the database:
/// it is derived at read time from `Sent` plus a past due date, so there is
/// no clock-driven transition to run or to miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

/// All monetary fields are integer minor units (cents). Division by the
/// minor-unit factor happens only in [`crate::money`], at display time.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub client_id: Uuid,
    pub number: String,
    pub status: InvoiceStatus,
    pub currency: String,
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The status readers see: a sent invoice past its due date reads as
    /// overdue without any persisted transition.
    pub fn display_status(&self, now: DateTime<Utc>) -> InvoiceStatus {
        match (self.status, self.due_date) {
            (InvoiceStatus::Sent, Some(due)) if due < now => InvoiceStatus::Overdue,
            (status, _) => status,
        }
    }

    /// Replace the persisted status with the derived one for serialization.
    pub fn with_display_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.display_status(now);
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub total: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
    pub items: Vec<InvoiceItem>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    #[garde(length(min = 1, max = 500))]
    pub description: String,
    #[garde(range(min = 1))]
    pub quantity: i64,
    /// Non-negative minor units.
    #[garde(range(min = 0))]
    pub unit_price: i64,
}

impl ItemInput {
    pub fn line_total(&self) -> i64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[garde(skip)]
    pub client_id: Uuid,
    #[garde(length(min = 3, max = 3), ascii)]
    pub currency: Option<String>,
    #[garde(skip)]
    pub due_date: Option<DateTime<Utc>>,
    #[garde(length(min = 1), dive)]
    pub items: Vec<ItemInput>,
}

/// Item replacement is all-or-nothing; there is no per-item patching.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    /// Outer `None` leaves the due date alone; `Some(None)` (an explicit
    /// JSON null) clears it.
    #[garde(skip)]
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[garde(length(min = 1), dive)]
    pub items: Option<Vec<ItemInput>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<DateTime<Utc>>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_payload_distinguishes_absent_from_null_due_date() {
        let absent: UpdateInvoiceRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.due_date, None);

        let cleared: UpdateInvoiceRequest =
            serde_json::from_value(json!({ "dueDate": null })).unwrap();
        assert_eq!(cleared.due_date, Some(None));

        let set: UpdateInvoiceRequest =
            serde_json::from_value(json!({ "dueDate": "2026-09-30T00:00:00Z" })).unwrap();
        assert!(matches!(set.due_date, Some(Some(_))));
    }
}
