//! API router with Swagger UI

use std::path::PathBuf;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::cookies::ACCESS_COOKIE;
use super::middleware::{admin_middleware, auth_middleware};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use super::modules::{activity_logs, auth, health, profile, users};
use super::state::AppState;

/// Multipart framing on top of the largest accepted avatar.
const UPLOAD_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Router settings that do not belong in [`AppState`].
#[derive(Clone)]
pub struct RouterOptions {
    /// Exposes `GET /metrics` when set.
    pub metrics: Option<PrometheusHandle>,
    /// Credentialed CORS for these origins; an empty list allows any origin
    /// without credentials.
    pub cors_origins: Vec<String>,
    /// Served under `/media`.
    pub media_root: PathBuf,
    pub max_avatar_bytes: usize,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token; browsers send the access_token cookie instead",
                        ))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::request_password_reset,
        auth::verify_password_reset,
        auth::me,
        auth::authenticated,
        users::register,
        users::list_users,
        users::update_user,
        users::change_status,
        users::delete_user,
        users::admin_reset_password,
        profile::update_profile,
        profile::update_avatar,
        activity_logs::list_activity_logs,
    ),
    components(
        schemas(
            users::UserDto,
            users::RegisterRequest,
            users::RegisterResponse,
            users::UpdateUserRequest,
            users::ChangeStatusRequest,
            users::AdminResetPasswordRequest,
            users::ResetTargetDto,
            auth::LoginRequest,
            auth::SessionResponse,
            auth::PasswordResetRequest,
            auth::VerifyPasswordResetRequest,
            profile::UpdateProfileRequest,
            profile::AvatarForm,
            activity_logs::ActivityLogDto,
            activity_logs::ActivityLogPage,
            activity_logs::UserSummaryDto,
            health::HealthResponse,
            health::DatabaseHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness check"),
        (name = "Authentication", description = "Cookie sessions, logout and OTP password reset"),
        (name = "Users", description = "Account administration (administrators only)"),
        (name = "Profile", description = "Self-service profile and avatar"),
        (name = "Activity logs", description = "Audit trail of account and session events"),
    ),
    info(
        title = "Regwatch Admin API",
        version = "1.0.0",
        description = "Accounts, sessions and audit trail of the regulatory-monitoring back office"
    )
)]
pub struct ApiDoc;

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Create the application router.
pub fn create_api_router(state: AppState, options: RouterOptions) -> Router {
    let public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/token/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/request-password-reset", post(auth::request_password_reset))
        .route("/verify-password-reset", post(auth::verify_password_reset));

    let upload_limit = DefaultBodyLimit::max(options.max_avatar_bytes + UPLOAD_OVERHEAD_BYTES);
    // Role check runs before any extractor touches the body or query.
    let admin_routes = Router::new()
        .route("/register", post(users::register))
        .route("/users", get(users::list_users))
        .route("/users/{id}", patch(users::update_user).delete(users::delete_user))
        .route("/users/{id}/status", patch(users::change_status))
        .route("/admin-reset-password", post(users::admin_reset_password))
        .route("/activity-logs", get(activity_logs::list_activity_logs))
        .route_layer(middleware::from_fn(admin_middleware));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/authenticated", get(auth::authenticated))
        .route("/me/update", patch(profile::update_profile))
        .route("/update-avatar", patch(profile::update_avatar).layer(upload_limit))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .route("/health", get(health::health_check))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .nest_service("/media", ServeDir::new(options.media_root));

    if let Some(handle) = options.metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state(MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer(&options.cors_origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/login",
            "/api/token/refresh",
            "/api/users/{id}",
            "/api/users/{id}/status",
            "/api/update-avatar",
            "/api/activity-logs",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
