//! First-run admin creation and the guard that forces it.

use axum::{
    Form,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::info;

use super::{AppState, WebError, views};
use crate::models::settings::SITE_TITLE;
use crate::services::AuthError;

const SETUP_PATH: &str = "/setup";

/// Paths reachable before any admin exists.
fn exempt(path: &str) -> bool {
    path == SETUP_PATH || path == "/healthz" || path.starts_with("/static/")
}

/// Redirects everything to `/setup` until an admin account exists.
pub async fn require_setup(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if exempt(request.uri().path()) || state.setup_complete().await? {
        return Ok(next.run(request).await);
    }

    Ok(Redirect::to(SETUP_PATH).into_response())
}

#[derive(Deserialize)]
pub struct SetupForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    /// Optional; blank keeps the default title.
    #[serde(default)]
    pub site_title: String,
}

/// GET /setup
pub async fn setup_form(State(state): State<AppState>) -> Result<Response, WebError> {
    if state.setup_complete().await? {
        return Ok(Redirect::to("/").into_response());
    }

    let settings = state.store.get_settings().await?;
    Ok(views::setup_page(&settings, None).into_response())
}

/// POST /setup
pub async fn create_admin(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Result<Response, WebError> {
    if state.setup_complete().await? {
        return Ok(Redirect::to("/").into_response());
    }

    let settings = state.store.get_settings().await?;
    let reject = |message: &str| {
        (
            StatusCode::BAD_REQUEST,
            views::setup_page(&settings, Some(message)),
        )
            .into_response()
    };

    if form.password != form.password_confirm {
        return Ok(reject("Passwords do not match"));
    }

    let username = form.username.trim();
    match state.auth.create_user(username, &form.password).await {
        Ok(user) => {
            state.mark_setup_complete();
            info!(user = %user.username, "Initial admin created via setup page");

            let site_title = form.site_title.trim();
            if !site_title.is_empty() {
                state.store.update_setting(SITE_TITLE, site_title).await?;
            }
            Ok(Redirect::to(crate::constants::LOGIN_PATH).into_response())
        }
        Err(AuthError::Validation(msg)) => Ok(reject(&msg)),
        Err(e) => Err(e.into()),
    }
}
