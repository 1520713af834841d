//! Sign-in, registration and sign-out flows.

use axum::http::StatusCode;

use ordertrack_core::{AccountStatus, Role};
use ordertrack_integration_tests::{TestApp, identity_for, record};

#[tokio::test]
async fn test_login_page_renders() {
    let app = TestApp::new();
    app.publish(None).await;

    let resp = app.get("/auth/login", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body.contains("action=\"/auth/login\""));
}

#[tokio::test]
async fn test_password_login_signs_in() {
    let app = TestApp::new();
    let buyer = record("buyer@example.com", Role::Buyer, AccountStatus::Active);
    app.identity.add_account(identity_for(&buyer), "hunter22");
    app.users.insert(buyer);

    let resp = app
        .post_form(
            "/auth/login",
            "email=buyer%40example.com&password=hunter22",
            None,
        )
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));

    let page = app.get("/dashboard", resp.cookie.as_deref()).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Welcome back"));
}

#[tokio::test]
async fn test_bad_password_returns_to_login_with_notice() {
    let app = TestApp::new();
    let buyer = record("buyer@example.com", Role::Buyer, AccountStatus::Active);
    app.identity.add_account(identity_for(&buyer), "hunter22");

    let resp = app
        .post_form("/auth/login", "email=buyer%40example.com&password=nope", None)
        .await;
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));

    let page = app.get("/auth/login", resp.cookie.as_deref()).await;
    assert!(page.body.contains("Invalid email or password."));
}

#[tokio::test]
async fn test_register_creates_pending_buyer() {
    let app = TestApp::new();

    let resp = app
        .post_form(
            "/auth/register",
            "name=Ada&email=ada%40example.com&password=secret1&password_confirm=secret1",
            None,
        )
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));

    let created = app.users.get("ada@example.com").expect("record created");
    assert_eq!(created.role, Some(Role::Buyer));
    assert_eq!(created.status, Some(AccountStatus::Pending));
    assert_eq!(created.name, "Ada");

    let page = app.get("/dashboard", resp.cookie.as_deref()).await;
    assert!(page.body.contains("waiting for activation"));
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = TestApp::new();

    let resp = app
        .post_form(
            "/auth/register",
            "name=Ada&email=ada%40example.com&password=secret1&password_confirm=secret2",
            None,
        )
        .await;
    assert_eq!(resp.location.as_deref(), Some("/auth/register"));
    assert!(app.users.get("ada@example.com").is_none());
}

#[tokio::test]
async fn test_federated_sign_in_creates_record_once() {
    let app = TestApp::new();

    let resp = app
        .post_form(
            "/auth/federated",
            "provider_id=google.com&id_token=fed",
            None,
        )
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));

    let created = app
        .users
        .get("fed@federated.example.com")
        .expect("record created");
    assert_eq!(created.status, Some(AccountStatus::Pending));
}

#[tokio::test]
async fn test_federated_sign_in_warns_when_record_is_not_saved() {
    let app = TestApp::new();
    app.users.fail_writes(true);

    let resp = app
        .post_form(
            "/auth/federated",
            "provider_id=google.com&id_token=fed",
            None,
        )
        .await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));
    assert!(app.users.get("fed@federated.example.com").is_none());

    let page = app.get("/dashboard", resp.cookie.as_deref()).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("your profile could not be saved"));
    assert!(!page.body.contains("class=\"notice notice-success\""));
}

#[tokio::test]
async fn test_signed_in_browser_skips_login_page() {
    let app = TestApp::new();
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;

    let own = app.get("/auth/login", Some(&cookie)).await;
    assert_eq!(own.location.as_deref(), Some("/dashboard"));

    let other = app.get("/auth/login", None).await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_is_neutral() {
    let app = TestApp::new();

    let resp = app
        .post_form("/auth/reset-password", "email=nobody%40example.com", None)
        .await;
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));

    let page = app.get("/auth/login", resp.cookie.as_deref()).await;
    assert!(page.body.contains("If an account exists for that email"));
}

#[tokio::test]
async fn test_logout_signs_out_with_notice() {
    let app = TestApp::new();
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;

    let resp = app.post_form("/auth/logout", "", Some(&cookie)).await;
    assert_eq!(resp.location.as_deref(), Some("/auth/login"));
    assert_eq!(app.state.session().snapshot().identity, None);

    let page = app.get("/auth/login", Some(&cookie)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("You have been signed out."));

    let dashboard = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.location.as_deref(), Some("/auth/login"));
}

#[tokio::test]
async fn test_failed_logout_keeps_session() {
    let app = TestApp::new();
    let cookie = app
        .sign_in_as(record("buyer@example.com", Role::Buyer, AccountStatus::Active))
        .await;
    app.identity.fail_sign_out(true);

    app.post_form("/auth/logout", "", Some(&cookie)).await;
    assert!(app.state.session().snapshot().identity.is_some());

    let page = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Sign-out failed"));
}
