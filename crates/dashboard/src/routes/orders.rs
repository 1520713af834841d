//! Order pages: a buyer's own orders, tracking, and the staff approval queue.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use chrono::{DateTime, Utc};
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::backend::{Order, OrderStatus, TrackingUpdate};
use crate::error::Result;
use crate::filters;
use crate::middleware::{IsAdminManager, IsLogin, IsNotSuspended};
use crate::notices::{Notice, push_notice, take_notices};
use crate::shell::ShellView;
use crate::state::AppState;

/// Route of the approval queue.
const PENDING_ROUTE: &str = "/dashboard/orders/pending";

/// Order row for templates.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub id_path: String,
    pub product_name: String,
    pub quantity: u32,
    pub buyer_email: String,
    pub status: &'static str,
    pub is_pending: bool,
    pub paid: bool,
    pub placed: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            id_path: urlencoding::encode(&order.id).into_owned(),
            product_name: order.product_name.clone(),
            quantity: order.quantity,
            buyer_email: order.buyer_email.to_string(),
            status: order.status.label(),
            is_pending: order.status == OrderStatus::Pending,
            paid: order.paid,
            placed: order.created_at.map(format_date).unwrap_or_default(),
        }
    }
}

/// Tracking entry for templates.
#[derive(Debug, Clone)]
pub struct TrackingRow {
    pub stage: String,
    pub location: String,
    pub note: String,
    pub at: String,
}

impl From<&TrackingUpdate> for TrackingRow {
    fn from(update: &TrackingUpdate) -> Self {
        Self {
            stage: update.stage.clone(),
            location: update.location.clone().unwrap_or_default(),
            note: update.note.clone().unwrap_or_default(),
            at: update.at.format("%b %-d, %Y %H:%M").to_string(),
        }
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// "My orders" template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/mine.html")]
pub struct MyOrdersTemplate {
    pub shell: ShellView,
    pub orders: Vec<OrderRow>,
    pub has_email: bool,
}

/// Tracking timeline template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/tracking.html")]
pub struct TrackingTemplate {
    pub shell: ShellView,
    pub order_id: String,
    pub updates: Vec<TrackingRow>,
}

/// Approval queue template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/pending.html")]
pub struct PendingOrdersTemplate {
    pub shell: ShellView,
    pub orders: Vec<OrderRow>,
}

/// The signed-in user's orders.
///
/// GET /dashboard/my-orders
#[instrument(skip_all)]
pub async fn my_orders(
    IsLogin(identity): IsLogin,
    IsNotSuspended(record): IsNotSuspended,
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let orders = match &identity.email {
        Some(email) => state.orders().orders_for_buyer(email).await?,
        None => Vec::new(),
    };

    Ok(MyOrdersTemplate {
        shell: ShellView::new(
            &identity,
            record.as_ref(),
            "/dashboard/my-orders",
            take_notices(&session).await,
        ),
        orders: orders.iter().map(OrderRow::from).collect(),
        has_email: identity.email.is_some(),
    })
}

/// Production timeline of one order.
///
/// GET /dashboard/orders/{id}/tracking
#[instrument(skip_all)]
pub async fn tracking(
    IsLogin(identity): IsLogin,
    IsNotSuspended(record): IsNotSuspended,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let updates = state.orders().tracking(&id).await?;

    Ok(TrackingTemplate {
        shell: ShellView::new(
            &identity,
            record.as_ref(),
            &format!("/dashboard/orders/{}/tracking", urlencoding::encode(&id)),
            take_notices(&session).await,
        ),
        order_id: id,
        updates: updates.iter().map(TrackingRow::from).collect(),
    })
}

/// Orders waiting for approval.
///
/// GET /dashboard/orders/pending
#[instrument(skip_all)]
pub async fn pending(
    IsLogin(identity): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let orders = state.orders().pending_orders().await?;

    Ok(PendingOrdersTemplate {
        shell: ShellView::new(
            &identity,
            Some(&viewer),
            PENDING_ROUTE,
            take_notices(&session).await,
        ),
        orders: orders.iter().map(OrderRow::from).collect(),
    })
}

/// Approve an order.
///
/// POST /dashboard/orders/{id}/approve
#[instrument(skip_all)]
pub async fn approve(
    IsLogin(_): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    state.orders().approve_order(&id).await?;
    info!(order_id = %id, by = %viewer.email, "Order approved");
    push_notice(&session, Notice::success(format!("Order {id} approved."))).await;
    Ok(Redirect::to(PENDING_ROUTE))
}

/// Reject an order.
///
/// POST /dashboard/orders/{id}/reject
#[instrument(skip_all)]
pub async fn reject(
    IsLogin(_): IsLogin,
    IsNotSuspended(_): IsNotSuspended,
    IsAdminManager(viewer): IsAdminManager,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    state.orders().reject_order(&id).await?;
    info!(order_id = %id, by = %viewer.email, "Order rejected");
    push_notice(&session, Notice::info(format!("Order {id} rejected."))).await;
    Ok(Redirect::to(PENDING_ROUTE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ordertrack_core::Email;

    use super::*;

    #[test]
    fn test_order_row_from_order() {
        let order = Order {
            id: "a/b".to_string(),
            product_name: "Denim Jacket".to_string(),
            quantity: 120,
            buyer_email: Email::parse("buyer@example.com").unwrap(),
            status: OrderStatus::Pending,
            paid: false,
            created_at: Some("2026-03-01T10:00:00Z".parse().unwrap()),
        };

        let row = OrderRow::from(&order);
        assert_eq!(row.id_path, "a%2Fb");
        assert_eq!(row.status, "Pending");
        assert!(row.is_pending);
        assert_eq!(row.placed, "Mar 1, 2026");
    }

    #[test]
    fn test_tracking_row_fills_blanks() {
        let update = TrackingUpdate {
            stage: "Cutting".to_string(),
            location: None,
            note: Some("On schedule".to_string()),
            at: "2026-03-02T08:30:00Z".parse().unwrap(),
        };

        let row = TrackingRow::from(&update);
        assert_eq!(row.location, "");
        assert_eq!(row.at, "Mar 2, 2026 08:30");
    }
}
