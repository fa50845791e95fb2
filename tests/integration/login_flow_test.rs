//! Integration tests for the login, password reset, and logout flows.

mod helpers;

use chrono::Duration;

use authguard_core::error::ErrorKind;

const EMAIL: &str = "student@example.com";
const IP: &str = "192.0.2.10";

#[tokio::test]
async fn test_login_success() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    let token = app.login(EMAIL, IP, "password123").unwrap();
    assert!(app.authorize(token).is_ok());
}

#[tokio::test]
async fn test_repeated_bad_passwords_lock_out_correct_password() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    for _ in 0..3 {
        let err = app.login(EMAIL, IP, "wrong").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    let err = app.login(EMAIL, IP, "password123").unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);
    assert_eq!(err.retry_after_seconds, Some(60));

    app.clock.advance(Duration::seconds(60));
    assert!(app.login(EMAIL, IP, "password123").is_ok());
}

#[tokio::test]
async fn test_successful_login_resets_failures() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    app.login(EMAIL, IP, "wrong").unwrap_err();
    app.login(EMAIL, IP, "wrong").unwrap_err();
    app.login(EMAIL, IP, "password123").unwrap();

    app.login(EMAIL, IP, "wrong").unwrap_err();
    assert!(!app.services.login_lockout.is_locked_out(EMAIL, IP));
}

#[tokio::test]
async fn test_mixed_case_email_shares_lockout() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    app.login("Student@Example.com", IP, "wrong").unwrap_err();
    app.login("STUDENT@example.com", IP, "wrong").unwrap_err();
    app.login("student@EXAMPLE.com", IP, "wrong").unwrap_err();

    let err = app.login(EMAIL, IP, "password123").unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);
}

#[tokio::test]
async fn test_password_reset_lockout_is_separate() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    app.reset_password(EMAIL, IP, false).unwrap_err();
    app.reset_password(EMAIL, IP, false).unwrap_err();

    let err = app.reset_password(EMAIL, IP, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimit);

    // Login is unaffected by the reset lockout.
    assert!(app.login(EMAIL, IP, "password123").is_ok());

    app.clock.advance(Duration::seconds(600));
    assert!(app.reset_password(EMAIL, IP, true).is_ok());
}

#[tokio::test]
async fn test_logout_revokes_token_until_natural_expiry() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    let token = app.login(EMAIL, IP, "password123").unwrap();
    app.logout(token);
    let err = app.authorize(token).unwrap_err();
    assert_eq!(err.message, "Token has been revoked");

    let denylist = &app.services.revoked_tokens;
    assert_eq!(denylist.len(), 1);

    app.clock.advance(Duration::minutes(16));
    assert!(app.eventually(|| denylist.is_empty()).await);
    assert_eq!(app.authorize(token).unwrap_err().message, "Token has expired");
}

#[tokio::test]
async fn test_refresh_rotation_rejects_old_token() {
    let mut app = helpers::TestApp::new();
    app.create_test_user(EMAIL, "password123");

    let old = app.login(EMAIL, IP, "password123").unwrap();
    let new = app.refresh(old).unwrap();

    assert!(app.authorize(new).is_ok());
    assert!(app.authorize(old).is_err());
    assert!(app.refresh(old).is_err());
}

#[tokio::test]
async fn test_idle_failures_are_reclaimed() {
    let app = helpers::TestApp::new();

    for i in 0..20 {
        app.login(&format!("ghost{i}@example.com"), &format!("198.51.100.{i}"), "x")
            .unwrap_err();
    }
    let lockout = &app.services.login_lockout;
    assert_eq!(lockout.tracked_entries(), 40);

    app.clock.advance(Duration::seconds(330));
    assert!(app.eventually(|| lockout.tracked_entries() == 0).await);
}
