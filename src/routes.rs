use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{auth, config::session::SessionLayer, handlers, middleware::add_security_headers, AppState};

/// Assembles every route over `state`. Sessions are supplied by the caller so
/// tests can use a throwaway store.
pub fn build_router(state: AppState, session_layer: SessionLayer) -> Router {
    let protected_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard_handler))
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments/{id}", post(handlers::update_appointment))
        .route(
            "/appointments/{id}/confirmation",
            get(handlers::confirmation_page),
        )
        .route(
            "/appointments/{id}/edit",
            get(handlers::edit_appointment_page),
        )
        .route(
            "/appointments/{id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route(
            "/appointments/{id}/delete",
            post(handlers::delete_appointment),
        )
        .route(
            "/appointments/{id}/receipt",
            get(handlers::appointment_receipt),
        )
        .route("/settings", get(handlers::show_settings_page))
        .route(
            "/settings/details",
            post(handlers::update_details_handler),
        )
        .route(
            "/settings/password",
            post(handlers::update_password_handler),
        )
        .layer(middleware::from_fn(auth::require_auth));

    let guest_routes = Router::new()
        .route("/", get(auth::handlers::login_page))
        .route(
            "/register",
            get(auth::handlers::register_page).post(auth::handlers::register_handler),
        )
        .layer(middleware::from_fn(auth::redirect_if_authenticated));

    Router::new()
        .merge(guest_routes)
        .route("/login", post(auth::handlers::login_handler))
        .route("/logout", get(auth::handlers::logout_handler))
        .route("/health", get(handlers::health_handler))
        .merge(protected_routes)
        .nest_service("/static", ServeDir::new("static"))
        .layer(session_layer)
        .layer(middleware::from_fn(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
