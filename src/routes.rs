use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers;
use crate::middleware::{route_guard, security_headers};
use crate::state::AppState;

/// The complete gateway: API proxies, gateway-owned endpoints, the page
/// bundle and the middleware stack around all of them.
pub fn app(state: AppState) -> Router {
    let public_dir = ServeDir::new(&state.config.server.public_dir)
        .append_index_html_on_directories(true);

    Router::new()
        .route("/health", get(handlers::health_get))
        .merge(auth_routes())
        .merge(attendance_routes())
        .merge(homework_routes())
        .merge(notification_routes())
        .merge(exam_routes())
        .merge(school_routes())
        .merge(registration_routes())
        // Pages and static assets
        .fallback_service(public_dir)
        // Global middleware; the last layer added runs first
        .layer(from_fn_with_state(state.clone(), route_guard))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(security_headers))
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/logout", post(auth::logout_post))
        .route("/api/auth/session", get(auth::session_get))
}

fn attendance_routes() -> Router<AppState> {
    use handlers::attendance;

    Router::new().route("/api/attendance/stats", get(attendance::stats))
}

fn homework_routes() -> Router<AppState> {
    use handlers::homework;

    Router::new()
        .route(
            "/api/homework",
            get(homework::collection).post(homework::collection),
        )
        .route(
            "/api/homework/:id",
            get(homework::item)
                .patch(homework::item)
                .delete(homework::item),
        )
        .route(
            "/api/homework/:id/submissions",
            get(homework::submissions).post(homework::submissions),
        )
        .route("/api/homework/submissions/:id/grade", patch(homework::grade))
}

fn notification_routes() -> Router<AppState> {
    use handlers::{guidance, notifications};

    Router::new()
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/:id/read", patch(notifications::mark_read))
        .route("/api/parent/guidance-notes", get(guidance::list))
}

fn exam_routes() -> Router<AppState> {
    use handlers::exams;

    Router::new()
        .route("/api/exams", get(exams::collection).post(exams::collection))
        .route(
            "/api/exams/:id",
            get(exams::item).patch(exams::item).delete(exams::item),
        )
        .route("/api/exams/:id/images", post(exams::images))
        .route("/api/exams/:id/analysis", get(exams::analysis))
        .route("/api/exams/:id/delete", post(exams::delete))
        .route("/api/exams/:id/download", get(exams::download))
}

fn school_routes() -> Router<AppState> {
    use handlers::{classes, files, payments, reports};

    Router::new()
        .route(
            "/api/payments",
            get(payments::collection).post(payments::collection),
        )
        .route("/api/payments/stats", get(payments::stats))
        .route("/api/classes", get(classes::list))
        .route("/api/classes/:id/students", get(classes::students))
        .route(
            "/api/students/:id",
            get(classes::student).patch(classes::student),
        )
        .route(
            "/api/reports",
            get(reports::collection).post(reports::collection),
        )
        .route("/api/files", get(files::fetch))
}

fn registration_routes() -> Router<AppState> {
    use handlers::registrations;

    Router::new()
        .route("/api/registrations", post(registrations::create))
        .route("/api/admin/registrations", get(registrations::list))
        .route(
            "/api/admin/registrations/:id",
            get(registrations::get).patch(registrations::review),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring unusable CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
