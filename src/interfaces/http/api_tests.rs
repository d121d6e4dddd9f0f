//! End-to-end tests driving the full router against in-memory SQLite.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::application::identity::password_reset::tests::RecordingNotifier;
use crate::config::AppConfig;
use crate::infrastructure::database::entities::password_reset_otp;
use crate::infrastructure::database::test_support::memory_db;
use crate::server::{build_gateway, build_router, ensure_admin};

const ADMIN_EMAIL: &str = "admin@regwatch.local";
const ADMIN_PASSWORD: &str = "admin12345";

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    notifier: Arc<RecordingNotifier>,
    media_root: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    /// `name=value` pairs of every Set-Cookie, ready for a Cookie header.
    fn session_cookie(&self) -> String {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect()
    }
}

async fn app() -> TestApp {
    let mut config = AppConfig::default();
    config.security.bcrypt_cost = 4;
    config.security.jwt_secret = "api-test-secret-0123456".into();
    config.accounts.media_root = std::env::temp_dir().join(format!("regwatch-{}", Uuid::new_v4()));

    let db = memory_db().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let gateway = build_gateway(&config, db.clone(), notifier.clone());
    ensure_admin(&db, gateway.credentials(), &config.admin)
        .await
        .unwrap();

    TestApp {
        router: build_router(&config, gateway, db.clone(), None),
        db,
        notifier,
        media_root: config.accounts.media_root,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn admin_session(&self) -> String {
        let reply = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.session_cookie()
    }

    /// Registers a staff account with the default password; returns its id.
    async fn register(&self, admin: &str, email: &str) -> i64 {
        let reply = self
            .call(
                Method::POST,
                "/api/register",
                Some(admin),
                Some(json!({
                    "email": email,
                    "first_name": "Lia",
                    "last_name": "Santos",
                    "user_level": "air_quality_unit_head"
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["data"]["user"]["id"].as_i64().unwrap()
    }

    async fn otp_rows(&self) -> u64 {
        password_reset_otp::Entity::find().count(&self.db).await.unwrap()
    }
}

#[tokio::test]
async fn login_sets_http_only_cookies() {
    let app = app().await;
    let reply = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    assert_eq!(reply.status, StatusCode::OK);
    let cookies = reply.set_cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("access_token=")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=")));
    assert_eq!(reply.body["data"]["using_default_password"], false);
    assert_eq!(reply.body["data"]["user"]["email"], ADMIN_EMAIL);
    assert!(reply.body["data"].get("access_token").is_none());
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let app = app().await;
    let wrong_password = app.login(ADMIN_EMAIL, "not-the-password").await;
    let unknown = app.login("ghost@regwatch.local", "not-the-password").await;

    assert_eq!(wrong_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password.body, unknown.body);
    assert!(wrong_password.set_cookies().is_empty());
}

#[tokio::test]
async fn me_requires_credentials() {
    let app = app().await;
    let reply = app.call(Method::GET, "/api/me", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["success"], false);

    let admin = app.admin_session().await;
    let reply = app.call(Method::GET, "/api/authenticated", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["user"]["user_level"], "administrator");
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let app = app().await;
    let reply = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let access = reply
        .set_cookies()
        .into_iter()
        .find_map(|c| {
            c.split(';')
                .next()
                .and_then(|kv| kv.strip_prefix("access_token="))
                .map(String::from)
        })
        .unwrap();

    let request = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {access}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::OK);
}

#[tokio::test]
async fn non_admin_is_forbidden_from_user_management() {
    let app = app().await;
    let admin = app.admin_session().await;
    app.register(&admin, "staff@regwatch.local").await;

    let login = app.login("staff@regwatch.local", "password123").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["data"]["using_default_password"], true);
    let staff = login.session_cookie();

    let reply = app.call(Method::GET, "/api/users", Some(&staff), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert!(reply.body.get("data").is_none());

    let reply = app.call(Method::GET, "/api/activity-logs", Some(&staff), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_check_precedes_input_validation() {
    let app = app().await;
    let admin = app.admin_session().await;
    let staff_id = app.register(&admin, "staff@regwatch.local").await;
    let staff = app.login("staff@regwatch.local", "password123").await.session_cookie();

    let reply = app
        .call(Method::GET, "/api/users?status=bogus", Some(&staff), None)
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert!(reply.body.get("errors").map_or(true, Value::is_null));

    let reply = app
        .call(Method::POST, "/api/register", Some(&staff), Some(json!({ "email": "nope" })))
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app
        .call(
            Method::PATCH,
            &format!("/api/users/{staff_id}"),
            Some(&staff),
            Some(json!({ "user_level": "emperor" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    // Same bad filter from an administrator is a validation error.
    let reply = app
        .call(Method::GET, "/api/users?status=bogus", Some(&admin), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["errors"]["status"].is_array());
}

#[tokio::test]
async fn register_lists_and_rejects_duplicates() {
    let app = app().await;
    let admin = app.admin_session().await;
    app.register(&admin, "new@regwatch.local").await;
    assert_eq!(
        app.notifier.created.lock().unwrap().as_slice(),
        ["new@regwatch.local".to_string()]
    );

    let duplicate = app
        .call(
            Method::POST,
            "/api/register",
            Some(&admin),
            Some(json!({
                "email": "NEW@regwatch.local",
                "first_name": "Other",
                "last_name": "Person",
                "user_level": "division_chief"
            })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert!(duplicate.body["errors"]["email"].is_array());

    let bad_level = app
        .call(
            Method::POST,
            "/api/register",
            Some(&admin),
            Some(json!({
                "email": "x@regwatch.local",
                "first_name": "X",
                "last_name": "Y",
                "user_level": "overlord"
            })),
        )
        .await;
    assert_eq!(bad_level.status, StatusCode::BAD_REQUEST);
    assert!(bad_level.body["errors"]["user_level"].is_array());

    let list = app.call(Method::GET, "/api/users", Some(&admin), None).await;
    assert_eq!(list.status, StatusCode::OK);
    let users = list.body["data"].as_array().unwrap();
    assert_eq!(users.len(), 1, "caller is excluded");
    assert_eq!(users[0]["email"], "new@regwatch.local");
}

#[tokio::test]
async fn admin_cannot_delete_or_demote_self() {
    let app = app().await;
    let admin = app.admin_session().await;
    let me = app.call(Method::GET, "/api/me", Some(&admin), None).await;
    let my_id = me.body["data"]["user"]["id"].as_i64().unwrap();

    let reply = app
        .call(Method::DELETE, &format!("/api/users/{my_id}"), Some(&admin), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .call(
            Method::PATCH,
            &format!("/api/users/{my_id}/status"),
            Some(&admin),
            Some(json!({ "status": "inactive" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let still_there = app.call(Method::GET, "/api/me", Some(&admin), None).await;
    assert_eq!(still_there.status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_user_then_missing_id_is_404() {
    let app = app().await;
    let admin = app.admin_session().await;
    let id = app.register(&admin, "gone@regwatch.local").await;

    let uri = format!("/api/users/{id}");
    assert_eq!(app.call(Method::DELETE, &uri, Some(&admin), None).await.status, StatusCode::OK);
    assert_eq!(
        app.call(Method::DELETE, &uri, Some(&admin), None).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn inactive_account_cannot_log_in() {
    let app = app().await;
    let admin = app.admin_session().await;
    let id = app.register(&admin, "idle@regwatch.local").await;

    let staff = app.login("idle@regwatch.local", "password123").await.session_cookie();

    let reply = app
        .call(
            Method::PATCH,
            &format!("/api/users/{id}/status"),
            Some(&admin),
            Some(json!({ "status": "inactive" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["status"], "inactive");

    let login = app.login("idle@regwatch.local", "password123").await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    // an existing session dies with the account
    let me = app.call(Method::GET, "/api/me", Some(&staff), None).await;
    assert_eq!(me.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_is_idempotent_and_revokes_the_session() {
    let app = app().await;
    let admin = app.admin_session().await;

    for _ in 0..2 {
        let reply = app.call(Method::POST, "/api/logout", Some(&admin), None).await;
        assert_eq!(reply.status, StatusCode::OK);
        let cleared = reply.set_cookies();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|c| c.contains("Max-Age=0")));
    }

    let reply = app.call(Method::GET, "/api/me", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let refresh = app.call(Method::POST, "/api/token/refresh", Some(&admin), None).await;
    assert_eq!(refresh.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_rotates_and_rejects_reuse() {
    let app = app().await;
    let missing = app.call(Method::POST, "/api/token/refresh", None, None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let session = app.admin_session().await;
    let first = app.call(Method::POST, "/api/token/refresh", Some(&session), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.set_cookies().len(), 2);

    let replay = app.call(Method::POST, "/api/token/refresh", Some(&session), None).await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.body["message"], "Invalid refresh token");

    let rotated = first.session_cookie();
    let second = app.call(Method::POST, "/api/token/refresh", Some(&rotated), None).await;
    assert_eq!(second.status, StatusCode::OK);
}

#[tokio::test]
async fn reset_request_does_not_reveal_accounts() {
    let app = app().await;
    let unknown = app
        .call(
            Method::POST,
            "/api/request-password-reset",
            None,
            Some(json!({ "email": "nobody@regwatch.local" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(app.otp_rows().await, 0);

    let known = app
        .call(
            Method::POST,
            "/api/request-password-reset",
            None,
            Some(json!({ "email": ADMIN_EMAIL })),
        )
        .await;
    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);
    assert_eq!(app.otp_rows().await, 1);
    assert_eq!(app.notifier.codes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reset_code_changes_password_once() {
    let app = app().await;
    app.call(
        Method::POST,
        "/api/request-password-reset",
        None,
        Some(json!({ "email": ADMIN_EMAIL })),
    )
    .await;
    let code = app.notifier.last_code().unwrap();

    let short = app
        .call(
            Method::POST,
            "/api/verify-password-reset",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "otp": code, "new_password": "short" })),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let body = json!({ "email": ADMIN_EMAIL, "otp": code, "new_password": "brand-new-secret" });
    let ok = app
        .call(Method::POST, "/api/verify-password-reset", None, Some(body.clone()))
        .await;
    assert_eq!(ok.status, StatusCode::OK);

    let reused = app
        .call(Method::POST, "/api/verify-password-reset", None, Some(body))
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.login(ADMIN_EMAIL, "brand-new-secret").await.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_reset_requires_step_up_password() {
    let app = app().await;
    let admin = app.admin_session().await;
    app.register(&admin, "forgetful@regwatch.local").await;

    let wrong = app
        .call(
            Method::POST,
            "/api/admin-reset-password",
            Some(&admin),
            Some(json!({ "admin_password": "guess", "email": "forgetful@regwatch.local" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert!(wrong.body["errors"]["admin_password"].is_array());

    let missing = app
        .call(
            Method::POST,
            "/api/admin-reset-password",
            Some(&admin),
            Some(json!({ "admin_password": ADMIN_PASSWORD, "email": "nobody@regwatch.local" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let ok = app
        .call(
            Method::POST,
            "/api/admin-reset-password",
            Some(&admin),
            Some(json!({ "admin_password": ADMIN_PASSWORD, "email": "forgetful@regwatch.local" })),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["data"]["email"], "forgetful@regwatch.local");

    let logs = app
        .call(
            Method::GET,
            "/api/activity-logs?action=admin_password_verification_failed",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(logs.body["data"]["count"], 1);
}

#[tokio::test]
async fn activity_logs_paginate_and_filter() {
    let app = app().await;
    let admin = app.admin_session().await;
    app.register(&admin, "one@regwatch.local").await;
    app.register(&admin, "two@regwatch.local").await;

    let page = app
        .call(Method::GET, "/api/activity-logs?page_size=2", Some(&admin), None)
        .await;
    assert_eq!(page.status, StatusCode::OK);
    let data = &page.body["data"];
    assert_eq!(data["count"], 3);
    assert_eq!(data["total_pages"], 2);
    assert_eq!(data["current_page"], 1);
    assert_eq!(data["has_next"], true);
    assert_eq!(data["has_previous"], false);
    assert_eq!(data["results"].as_array().unwrap().len(), 2);
    assert_eq!(data["results"][0]["action"], "user_created");

    let created = app
        .call(Method::GET, "/api/activity-logs?action=user_created", Some(&admin), None)
        .await;
    assert_eq!(created.body["data"]["count"], 2);
    assert_eq!(created.body["data"]["results"][0]["admin"]["email"], ADMIN_EMAIL);

    let bad = app
        .call(Method::GET, "/api/activity-logs?action=bogus", Some(&admin), None)
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_checks_current_password() {
    let app = app().await;
    let admin = app.admin_session().await;

    let reply = app
        .call(
            Method::PATCH,
            "/api/me/update",
            Some(&admin),
            Some(json!({ "current_password": "nope", "new_password": "another-secret" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["errors"]["current_password"].is_array());

    let reply = app
        .call(
            Method::PATCH,
            "/api/me/update",
            Some(&admin),
            Some(json!({ "first_name": "Root" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["full_name"], "Root Administrator");
}

fn multipart(content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "regwatch-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[tokio::test]
async fn avatar_upload_validates_type_and_busts_cache() {
    let app = app().await;
    let admin = app.admin_session().await;

    let upload = |content_type: &str| {
        let (form_type, body) = multipart(content_type, b"\x89PNG\r\n\x1a\nfake");
        Request::builder()
            .method(Method::PATCH)
            .uri("/api/update-avatar")
            .header(header::COOKIE, admin.as_str())
            .header(header::CONTENT_TYPE, form_type)
            .body(Body::from(body))
            .unwrap()
    };

    let rejected = app.send(upload("text/plain")).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert!(rejected.body["errors"]["avatar"].is_array());

    let accepted = app.send(upload("image/png")).await;
    assert_eq!(accepted.status, StatusCode::OK, "{}", accepted.body);
    let user = &accepted.body["data"];
    let avatar = user["avatar"].as_str().unwrap();
    assert!(avatar.starts_with("avatars/") && avatar.ends_with(".png"));
    assert!(user["avatar_url"].as_str().unwrap().contains("?t="));
    assert!(app.media_root.join(avatar).exists());
}

#[tokio::test]
async fn health_reports_database() {
    let app = app().await;
    let reply = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["database"]["reachable"], true);
    assert!(reply.headers.contains_key("x-request-id"));
}
