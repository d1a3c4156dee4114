mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use docchat_core::ports::DatabaseService;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn register_returns_access_token_and_sets_refresh_cookie() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ana", "email": "ana@x.com", "password": "longpassword1" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert!(!response.body["accessToken"].as_str().unwrap().is_empty());
    assert!(response.body.get("refreshToken").is_none());

    let set_cookie = response.headers["set-cookie"].to_str().unwrap();
    assert!(set_cookie.starts_with("refreshToken="));
    assert!(set_cookie.contains("HttpOnly"));

    let stored = app.state.db.find_user_by_email("ana@x.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash.as_deref(), Some("longpassword1"));
    assert!(!stored.is_account_verified);
}

#[tokio::test]
async fn duplicate_registration_conflicts_even_with_different_case() {
    let app = TestApp::new();
    app.register("Ana", "ana@x.com", "longpassword1").await;

    let response = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "  ANA@x.com", "password": "longpassword2" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn invalid_registration_is_rejected_before_anything_is_stored() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "", "email": "nope", "password": "short" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let message = response.body["message"].as_str().unwrap();
    assert!(message.starts_with("name: "));
    assert!(message.contains(" | email: "));
    assert!(message.contains(" | password: "));
    assert!(app.state.db.find_user_by_email("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn login_checks_password_and_hides_which_part_was_wrong() {
    let app = TestApp::new();
    app.register("Ana", "ana@x.com", "longpassword1").await;

    let ok = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "longpassword1" })),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.refresh_cookie().is_some());

    let wrong_password = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "wrongpassword" })),
        )
        .await;
    let unknown_email = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "who@x.com", "password": "longpassword1" })),
        )
        .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["message"], unknown_email.body["message"]);
}

#[tokio::test]
async fn refresh_issues_access_token_for_the_same_user() {
    let app = TestApp::new();
    let (access, cookie) = app.register("Ana", "ana@x.com", "longpassword1").await;
    let user_id = app.state.tokens.verify_access_token(&access).unwrap();

    let response = app.with_cookie(Method::POST, "/api/auth/refresh", &cookie).await;
    assert_eq!(response.status, StatusCode::OK);
    let rotated = response.body["accessToken"].as_str().unwrap();
    assert_eq!(app.state.tokens.verify_access_token(rotated), Ok(user_id));
    assert!(response.refresh_cookie().is_none());
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthorized() {
    let app = TestApp::new();
    let response = app.call(Method::POST, "/api/auth/refresh", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "No refresh token provided");
}

#[tokio::test]
async fn logout_is_idempotent_and_revokes_the_refresh_token() {
    let app = TestApp::new();
    let (_, cookie) = app.register("Ana", "ana@x.com", "longpassword1").await;

    for _ in 0..2 {
        let response = app.with_cookie(Method::POST, "/api/auth/logout", &cookie).await;
        assert_eq!(response.status, StatusCode::OK);
        let cleared = response.headers["set-cookie"].to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
    }
    let bare = app.call(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(bare.status, StatusCode::OK);

    let response = app.with_cookie(Method::POST, "/api/auth/refresh", &cookie).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn new_login_invalidates_the_previous_refresh_token() {
    let app = TestApp::new();
    let (_, first_cookie) = app.register("Ana", "ana@x.com", "longpassword1").await;
    let login = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "longpassword1" })),
        )
        .await;
    let second_cookie = login.refresh_cookie().unwrap();

    let stale = app.with_cookie(Method::POST, "/api/auth/refresh", &first_cookie).await;
    let current = app.with_cookie(Method::POST, "/api/auth/refresh", &second_cookie).await;
    assert_eq!(stale.status, StatusCode::FORBIDDEN);
    assert_eq!(current.status, StatusCode::OK);
}

#[tokio::test]
async fn valid_token_for_an_unknown_user_is_rejected() {
    let app = TestApp::new();
    let token = app.state.tokens.issue_access_token(Uuid::new_v4()).unwrap();

    let response = app.call(Method::GET, "/api/user/me", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Unauthorized: User not found");
    assert!(response.body.get("error").is_none());
}

#[tokio::test]
async fn protected_routes_distinguish_expired_from_invalid_tokens() {
    let app = TestApp::new();
    let (access, _) = app.register("Ana", "ana@x.com", "longpassword1").await;
    let user_id = app.state.tokens.verify_access_token(&access).unwrap();

    let missing = app.call(Method::GET, "/api/user/me", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert!(missing.body.get("error").is_none());

    let garbage = app.call(Method::GET, "/api/user/me", Some("not.a.jwt"), None).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert!(garbage.body.get("error").is_none());

    let old = app
        .state
        .tokens
        .issue_access_token_at(user_id, Utc::now() - Duration::minutes(16))
        .unwrap();
    let expired = app.call(Method::GET, "/api/user/me", Some(&old), None).await;
    assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired.body["error"], "TOKEN_EXPIRED");

    let me = app.call(Method::GET, "/api/user/me", Some(&access), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["userData"]["email"], "ana@x.com");
    assert_eq!(me.body["userData"]["authProvider"], "credentials");
    assert!(me.body["userData"].get("passwordHash").is_none());

    let is_auth = app.call(Method::GET, "/api/auth/is-auth", Some(&access), None).await;
    assert_eq!(is_auth.status, StatusCode::OK);
}

#[tokio::test]
async fn verification_code_flow() {
    let app = TestApp::new();
    let (access, _) = app.register("Ana", "ana@x.com", "longpassword1").await;

    let sent = app
        .call(Method::POST, "/api/auth/send-verify-otp", Some(&access), None)
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    let code = app.mailer.last_code_for("ana@x.com");
    assert_eq!(code.len(), 6);

    let wrong = if code == "111111" { "222222" } else { "111111" };
    let rejected = app
        .call(
            Method::POST,
            "/api/auth/verify-account",
            Some(&access),
            Some(json!({ "otp": wrong })),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["message"], "Invalid OTP");

    let accepted = app
        .call(
            Method::POST,
            "/api/auth/verify-account",
            Some(&access),
            Some(json!({ "otp": code })),
        )
        .await;
    assert_eq!(accepted.status, StatusCode::OK);

    let again = app
        .call(Method::POST, "/api/auth/send-verify-otp", Some(&access), None)
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["message"], "Account already verified");
}

#[tokio::test]
async fn expired_code_with_matching_value_reports_expiry() {
    let app = TestApp::new();
    let (access, _) = app.register("Ana", "ana@x.com", "longpassword1").await;
    app.call(Method::POST, "/api/auth/send-verify-otp", Some(&access), None)
        .await;
    let code = app.mailer.last_code_for("ana@x.com");

    let mut user = app.state.db.find_user_by_email("ana@x.com").await.unwrap().unwrap();
    if let Some(otp) = user.verify_otp.as_mut() {
        otp.expires_at = Utc::now() - Duration::minutes(1);
    }
    app.state.db.save_user(&user).await.unwrap();

    let response = app
        .call(
            Method::POST,
            "/api/auth/verify-account",
            Some(&access),
            Some(json!({ "otp": code })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "OTP expired. Please request a new one.");
}

#[tokio::test]
async fn password_reset_replaces_the_hash() {
    let app = TestApp::new();
    app.register("Ana", "ana@x.com", "longpassword1").await;

    let sent = app
        .call(
            Method::POST,
            "/api/auth/send-reset-otp",
            None,
            Some(json!({ "email": "ana@x.com" })),
        )
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    let code = app.mailer.last_code_for("ana@x.com");

    let reset = app
        .call(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "email": "ana@x.com", "otp": code, "newPassword": "brandnewpass" })),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    let old = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "longpassword1" })),
        )
        .await;
    let new = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@x.com", "password": "brandnewpass" })),
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    assert_eq!(new.status, StatusCode::OK);

    let user = app.state.db.find_user_by_email("ana@x.com").await.unwrap().unwrap();
    assert!(user.reset_otp.is_none());
}

#[tokio::test]
async fn reset_code_for_unknown_email_is_not_found() {
    let app = TestApp::new();
    let response = app
        .call(
            Method::POST,
            "/api/auth/send-reset-otp",
            None,
            Some(json!({ "email": "ghost@x.com" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mail_failure_fails_code_delivery_but_not_registration() {
    let app = TestApp::new();
    app.mailer.fail.store(true, std::sync::atomic::Ordering::SeqCst);

    let (access, _) = app.register("Ana", "ana@x.com", "longpassword1").await;
    let response = app
        .call(Method::POST, "/api/auth/send-verify-otp", Some(&access), None)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}
