//! Order pages.

use axum::http::StatusCode;

use ordertrack_core::{AccountStatus, Role};
use ordertrack_dashboard::backend::OrderStatus;
use ordertrack_integration_tests::{TestApp, record};

#[tokio::test]
async fn test_buyer_sees_only_own_orders() {
    let app = TestApp::new();
    app.orders.add_order("o-1", "buyer@example.com", "Denim Jacket");
    app.orders.add_order("o-2", "someone@example.com", "Linen Shirt");
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;

    let resp = app.get("/dashboard/my-orders", Some(&cookie)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Denim Jacket"));
    assert!(!resp.body.contains("Linen Shirt"));
}

#[tokio::test]
async fn test_tracking_is_oldest_first() {
    let app = TestApp::new();
    app.orders.add_order("o-1", "buyer@example.com", "Denim Jacket");
    app.orders.add_tracking("o-1", "Shipped", "2026-03-05T10:00:00Z");
    app.orders.add_tracking("o-1", "Cutting", "2026-03-01T10:00:00Z");
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;

    let resp = app.get("/dashboard/orders/o-1/tracking", Some(&cookie)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let cutting = resp.body.find("Cutting").expect("cutting stage");
    let shipped = resp.body.find("Shipped").expect("shipped stage");
    assert!(cutting < shipped);
}

#[tokio::test]
async fn test_manager_approves_and_rejects() {
    let app = TestApp::new();
    app.orders.add_order("o-1", "buyer@example.com", "Denim Jacket");
    app.orders.add_order("o-2", "buyer@example.com", "Linen Shirt");
    let cookie = app
        .sign_in_as(record("boss@example.com", Role::Manager, AccountStatus::Active))
        .await;

    let queue = app.get("/dashboard/orders/pending", Some(&cookie)).await;
    assert!(queue.body.contains("Denim Jacket"));
    assert!(queue.body.contains("Linen Shirt"));

    let resp = app
        .post_form("/dashboard/orders/o-1/approve", "", Some(&cookie))
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard/orders/pending"));
    app.post_form("/dashboard/orders/o-2/reject", "", Some(&cookie)).await;

    assert_eq!(app.orders.status("o-1"), Some(OrderStatus::Approved));
    assert_eq!(app.orders.status("o-2"), Some(OrderStatus::Rejected));

    let page = app.get("/dashboard/orders/pending", Some(&cookie)).await;
    assert!(page.body.contains("Order o-1 approved."));
    assert!(page.body.contains("No orders are waiting for approval."));
}

#[tokio::test]
async fn test_buyer_cannot_approve() {
    let app = TestApp::new();
    app.orders.add_order("o-1", "buyer@example.com", "Denim Jacket");
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;

    let resp = app
        .post_form("/dashboard/orders/o-1/approve", "", Some(&cookie))
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));
    assert_eq!(app.orders.status("o-1"), Some(OrderStatus::Pending));
}

#[tokio::test]
async fn test_staff_overview_shows_stats() {
    let app = TestApp::new();
    app.orders.add_order("o-1", "buyer@example.com", "Denim Jacket");
    let cookie = app
        .sign_in_as(record("admin@example.com", Role::Admin, AccountStatus::Active))
        .await;

    let resp = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("Manage Users"));
    assert!(resp.body.contains("<h3>Pending</h3>"));
}

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::new();
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;

    let resp = app
        .post_form("/dashboard/profile", "display_name=Ada+L&photo_url=", Some(&cookie))
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard/profile"));
    assert_eq!(
        app.identity.current().and_then(|i| i.display_name),
        Some("Ada L".to_string())
    );
}
