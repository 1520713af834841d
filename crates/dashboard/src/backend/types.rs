//! Documents exchanged with the order tracking backend.
//!
//! Orders and tracking updates are owned and validated by the backend; the
//! dashboard only displays them, so unknown fields are ignored and unknown
//! status strings are kept as [`OrderStatus::Other`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordertrack_core::{AccountStatus, Email};

/// Body of `PATCH /users/{email}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// New status.
    pub status: AccountStatus,
    /// Required when suspending, cleared otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend_reason: Option<String>,
}

impl StatusUpdate {
    /// Activate or reactivate an account.
    #[must_use]
    pub const fn activate() -> Self {
        Self {
            status: AccountStatus::Active,
            suspend_reason: None,
        }
    }

    /// Suspend an account with a reason.
    #[must_use]
    pub fn suspend(reason: &str) -> Self {
        let reason = reason.trim();
        Self {
            status: AccountStatus::Suspended,
            suspend_reason: (!reason.is_empty()).then(|| reason.to_string()),
        }
    }
}

/// Approval state of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for a manager.
    Pending,
    /// Accepted into production.
    Approved,
    /// Declined by a manager.
    Rejected,
    /// Any status this dashboard does not know.
    #[serde(other)]
    Other,
}

impl OrderStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Other => "Unknown",
        }
    }
}

/// An order as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Backend document ID.
    #[serde(alias = "_id")]
    pub id: String,
    /// Ordered product.
    pub product_name: String,
    /// Units ordered.
    #[serde(default)]
    pub quantity: u32,
    /// Buyer who placed the order.
    pub buyer_email: Email,
    /// Approval state.
    pub status: OrderStatus,
    /// Whether the payment step completed.
    #[serde(default)]
    pub paid: bool,
    /// When the order was placed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry of an order's production timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    /// Production stage, e.g. "Cutting" or "Shipped".
    pub stage: String,
    /// Where the stage happened.
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form note from the manager.
    #[serde(default)]
    pub note: Option<String>,
    /// When the update was recorded.
    pub at: DateTime<Utc>,
}

/// Aggregate counters for the staff overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    /// Registered accounts.
    pub total_users: u64,
    /// Products in the catalogue.
    pub total_products: u64,
    /// Orders of any status.
    pub total_orders: u64,
    /// Orders waiting for approval.
    pub pending_orders: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_suspend_trims_reason() {
        assert_eq!(
            StatusUpdate::suspend("  unpaid invoices ").suspend_reason.as_deref(),
            Some("unpaid invoices")
        );
        assert_eq!(StatusUpdate::suspend("   ").suspend_reason, None);
    }

    #[test]
    fn test_status_update_wire_shape() {
        let value = serde_json::to_value(StatusUpdate::suspend("fraud")).unwrap();
        assert_eq!(value, serde_json::json!({"status": "suspended", "suspendReason": "fraud"}));

        let value = serde_json::to_value(StatusUpdate::activate()).unwrap();
        assert_eq!(value, serde_json::json!({"status": "active"}));
    }

    #[test]
    fn test_order_accepts_mongo_style_id_and_unknown_status() {
        let json = serde_json::json!({
            "_id": "665f1c",
            "productName": "Denim Jacket",
            "quantity": 120,
            "buyerEmail": "buyer@example.com",
            "status": "on_hold",
            "createdAt": "2026-03-01T10:00:00Z"
        });
        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.id, "665f1c");
        assert_eq!(order.status, OrderStatus::Other);
        assert!(!order.paid);
        assert!(order.created_at.is_some());
    }

    #[test]
    fn test_stats_tolerate_missing_fields() {
        let stats: DashboardStats =
            serde_json::from_value(serde_json::json!({"totalOrders": 9})).unwrap();
        assert_eq!(stats.total_orders, 9);
        assert_eq!(stats.total_users, 0);
    }
}
