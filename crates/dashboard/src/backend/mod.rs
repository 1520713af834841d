//! Order tracking backend.
//!
//! The backend is an external REST service. The dashboard talks to it through
//! two narrow traits so the guards and pages can run against in-memory fakes:
//!
//! - [`UserDirectory`] - user records (`/users`)
//! - [`OrderBook`] - orders, tracking and aggregate stats
//!
//! [`BackendClient`] implements both over HTTP.
//!
//! # Endpoints
//!
//! ```text
//! GET   /users/{email}            - Role/status record (the guards' only dependency)
//! GET   /users                    - All records
//! POST  /users                    - Create record (self-registration)
//! PATCH /users/{email}/status     - Activate / suspend
//! PATCH /users/{email}/manager    - Set or clear managerFor
//! GET   /orders?buyer={email}     - A buyer's orders
//! GET   /orders/pending           - Approval queue
//! PATCH /orders/approve/{id}      - Approve
//! PATCH /orders/reject/{id}       - Reject
//! GET   /tracking/{orderId}       - Production timeline
//! GET   /admin/stats              - Aggregate counters
//! ```

mod client;
mod error;
mod types;

pub use client::BackendClient;
pub use error::BackendError;
pub use types::*;

use async_trait::async_trait;

use ordertrack_core::{Email, ManagerAssignment, UserRecord};

/// Read and write access to backend user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch the record for `email`; `Ok(None)` when the backend has none.
    async fn get_user(&self, email: &Email) -> Result<Option<UserRecord>, BackendError>;

    /// List every record.
    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError>;

    /// Create a record.
    async fn create_user(&self, record: &UserRecord) -> Result<(), BackendError>;

    /// Change an account's status.
    async fn update_status(&self, email: &Email, update: &StatusUpdate)
    -> Result<(), BackendError>;

    /// Set or clear `managerFor`.
    async fn assign_manager(
        &self,
        email: &Email,
        assignment: &ManagerAssignment,
    ) -> Result<(), BackendError>;
}

/// Orders, tracking timelines and counters.
#[async_trait]
pub trait OrderBook: Send + Sync {
    /// Orders placed by `buyer`.
    async fn orders_for_buyer(&self, buyer: &Email) -> Result<Vec<Order>, BackendError>;

    /// Orders waiting for approval.
    async fn pending_orders(&self) -> Result<Vec<Order>, BackendError>;

    /// Approve an order.
    async fn approve_order(&self, order_id: &str) -> Result<(), BackendError>;

    /// Reject an order.
    async fn reject_order(&self, order_id: &str) -> Result<(), BackendError>;

    /// Production timeline of an order, oldest first.
    async fn tracking(&self, order_id: &str) -> Result<Vec<TrackingUpdate>, BackendError>;

    /// Aggregate counters.
    async fn stats(&self) -> Result<DashboardStats, BackendError>;
}
