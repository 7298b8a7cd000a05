//! Domain service for admin authentication.
//!
//! Handles login (throttled per client address), session validation, logout,
//! and creation of admin credentials.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts. Try again in {}s.", whole_seconds(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("Session expired or invalid")]
    SessionExpiredOrInvalid,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Remaining wait rounded up, so a client never retries too early.
fn whole_seconds(duration: &Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

impl AuthError {
    /// Seconds for the `Retry-After` header of a throttled response.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(whole_seconds(retry_after)),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::StoreUnavailable(format!("{err:#}"))
    }
}

/// The authenticated admin behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub user_id: i32,
    pub username: String,
}

/// A freshly persisted session, to be handed to the client as a cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Throttle check, password verification and session issuance.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RateLimited`] while `address` is cooling down and
    /// [`AuthError::InvalidCredentials`] if verification fails. Every failed
    /// verification counts against `address`; success clears its history.
    async fn login(
        &self,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError>;

    /// Resolves a session token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionExpiredOrInvalid`] for unknown tokens and for
    /// sessions at or past their expiry (which are deleted on the spot).
    async fn validate_session(&self, token: &str) -> Result<SessionUser, AuthError>;

    /// Deletes the session if it exists. Unknown tokens are not an error.
    async fn logout(&self, token: &str) -> Result<(), AuthError>;

    /// Hashes `password` and stores a new admin credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for an empty username, a short
    /// password or a username that is already taken.
    async fn create_user(&self, username: &str, password: &str) -> Result<SessionUser, AuthError>;

    async fn has_users(&self) -> Result<bool, AuthError>;

    /// Deletes every session whose expiry has passed. Returns the number removed.
    async fn purge_expired_sessions(&self) -> Result<u64, AuthError>;
}
