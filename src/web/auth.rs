use axum::{
    Form,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use tower_sessions::cookie::{Cookie, SameSite};

use super::{AppState, WebError, views};
use crate::constants::{ADMIN_PATH, LOGIN_PATH, SESSION_COOKIE_NAME};
use crate::services::{AuthError, SessionUser};

// ============================================================================
// Client address
// ============================================================================

/// Best-effort client address used as the login throttling key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// First `X-Forwarded-For` entry when trusted, else the peer IP, else `"unknown"`.
#[must_use]
pub fn resolve_client_addr(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for
        && let Some(first) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    peer.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
}

impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self(resolve_client_addr(
            &parts.headers,
            peer,
            state.config.server.trust_forwarded_for,
        )))
    }
}

// ============================================================================
// Cookies
// ============================================================================

/// The session token from the request cookies, if any.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

fn session_cookie(token: String, secure: bool, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path(ADMIN_PATH)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(max_age)
        .build()
}

fn set_cookie_header(cookie: &Cookie<'_>) -> Result<HeaderValue, WebError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| WebError::InternalError(format!("Invalid cookie header: {e}")))
}

// ============================================================================
// Middleware
// ============================================================================

/// Gate for the admin routes: a valid, unexpired session or a redirect to the
/// login page. The resolved [`SessionUser`] is placed in request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some(token) = session_token(request.headers()) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    match state.auth.validate_session(&token).await {
        Ok(user) => {
            tracing::Span::current().record("user", user.username.as_str());
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Err(AuthError::SessionExpiredOrInvalid) => Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// GET /admin/login
pub async fn login_form(State(state): State<AppState>) -> Result<Response, WebError> {
    let settings = state.store.get_settings().await?;
    Ok(views::login_page(&settings, None).into_response())
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    ClientAddr(address): ClientAddr,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    match state.auth.login(&address, &form.username, &form.password).await {
        Ok(session) => {
            let max_age =
                time::Duration::hours(i64::from(state.config.security.session_ttl_hours));
            let cookie = session_cookie(session.token, state.config.server.secure_cookies, max_age);

            Ok((
                [(header::SET_COOKIE, set_cookie_header(&cookie)?)],
                Redirect::to("/admin/"),
            )
                .into_response())
        }
        Err(err @ AuthError::InvalidCredentials) => {
            let settings = state.store.get_settings().await?;
            Ok((
                StatusCode::UNAUTHORIZED,
                views::login_page(&settings, Some(&err.to_string())),
            )
                .into_response())
        }
        Err(err @ AuthError::RateLimited { .. }) => {
            let settings = state.store.get_settings().await?;
            let retry_after = err.retry_after_secs().unwrap_or(1);
            Ok((
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                views::login_page(&settings, Some(&err.to_string())),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /admin/logout
///
/// Works without a valid session so a stale cookie can always be cleared.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    if let Some(token) = session_token(&headers) {
        state.auth.logout(&token).await?;
    }

    let cleared = session_cookie(
        String::new(),
        state.config.server.secure_cookies,
        time::Duration::ZERO,
    );

    Ok((
        [(header::SET_COOKIE, set_cookie_header(&cleared)?)],
        Redirect::to(LOGIN_PATH),
    )
        .into_response())
}

/// Pulls the gate's [`SessionUser`] out of the request extensions.
impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| WebError::InternalError("Session user missing from request".into()))
    }
}
