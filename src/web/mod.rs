use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::constants::limits::MAX_FORM_BYTES;
use crate::state::SharedState;

mod admin;
mod assets;
pub mod auth;
mod error;
mod observability;
mod public;
mod setup;
pub mod views;

pub use auth::ClientAddr;
pub use error::WebError;

pub type AppState = Arc<SharedState>;

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.root());

    Router::new()
        .route("/", get(public::home))
        .route("/music/{category}/{slug}", get(public::show_review))
        .route("/setup", get(setup::setup_form).post(setup::create_admin))
        .route("/healthz", get(observability::health))
        .route("/static/{*path}", get(assets::serve_asset))
        .route("/admin", get(|| async { Redirect::to("/admin/") }))
        .route("/admin/login", get(auth::login_form).post(auth::login))
        .route("/admin/logout", post(auth::logout))
        .merge(create_admin_router(state.clone()))
        .nest_service("/uploads", uploads)
        .fallback(public::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            setup::require_setup,
        ))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn create_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/", get(admin::dashboard))
        .route("/admin/reviews/new", get(admin::new_review_form))
        .route("/admin/reviews", post(admin::create_review))
        .route(
            "/admin/settings",
            get(admin::settings_form).post(admin::save_settings),
        )
        .route("/admin/metrics", get(observability::get_metrics))
        .route("/admin/{category}/{id}/edit", get(admin::edit_review_form))
        .route("/admin/{category}/{id}", post(admin::update_review))
        .route("/admin/{category}/{id}/delete", post(admin::delete_review))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_session,
        ))
}
