pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router. Shared between `main` and the
/// integration tests so both exercise the same routes and layers.
pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/barbers", get(handlers::public::list_barbers))
        .route("/api/barbers/:id", get(handlers::public::get_barber))
        .route(
            "/api/barbers/:id/services",
            get(handlers::public::list_barber_services),
        )
        .route(
            "/api/barbers/:id/available-slots",
            get(handlers::public::available_slots),
        )
        .route("/api/appointments", post(handlers::public::create_appointment))
        .route(
            "/api/appointments/confirm/:token",
            get(handlers::public::confirm_appointment),
        )
        .route(
            "/api/appointments/check/:token",
            get(handlers::public::check_appointment),
        )
        .route(
            "/api/appointments/cancel/:token",
            post(handlers::public::cancel_appointment),
        )
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))
        .route(
            "/api/admin/appointments",
            get(handlers::admin::list_appointments),
        )
        .route(
            "/api/admin/appointments/:id",
            put(handlers::admin::update_appointment),
        )
        .route("/api/admin/barbers", post(handlers::admin::create_barber))
        .route(
            "/api/admin/barbers/:id",
            put(handlers::admin::update_barber),
        )
        .route(
            "/api/admin/barbers/:id",
            delete(handlers::admin::delete_barber),
        )
        .route("/api/admin/services", post(handlers::admin::create_service))
        .route(
            "/api/admin/services/:id",
            put(handlers::admin::update_service),
        )
        .route(
            "/api/admin/services/:id",
            delete(handlers::admin::delete_service),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
