//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::constants::limits::MIN_PASSWORD_LEN;
use crate::db::{Store, User};
use crate::services::auth_service::{AuthError, AuthService, IssuedSession, SessionUser};
use crate::services::credentials;
use crate::services::rate_limiter::LoginLimiter;

/// Stand-in verified against when the username is unknown, so both failure
/// paths cost one Argon2 verification.
const DUMMY_PASSWORD: &str = "ditchfork-dummy-password";

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
        }
    }
}

pub struct SeaOrmAuthService {
    store: Store,
    limiter: Arc<LoginLimiter>,
    security: SecurityConfig,
    dummy_hash: String,
}

impl SeaOrmAuthService {
    /// Computes the dummy hash once with the configured cost.
    ///
    /// # Errors
    ///
    /// Fails if the Argon2 parameters in `security` are invalid.
    pub fn new(
        store: Store,
        limiter: Arc<LoginLimiter>,
        security: SecurityConfig,
    ) -> anyhow::Result<Self> {
        let dummy_hash = credentials::hash_password(DUMMY_PASSWORD, &security)?;
        Ok(Self {
            store,
            limiter,
            security,
            dummy_hash,
        })
    }

    fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.security.session_ttl_hours))
    }

    async fn verify_blocking(password: &str, hash: String) -> Result<bool, AuthError> {
        let password = password.to_string();
        task::spawn_blocking(move || credentials::verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("{e:#}")))
    }

    /// Session check against an explicit clock.
    pub async fn validate_session_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionUser, AuthError> {
        let Some(session) = self.store.get_session(token).await? else {
            return Err(AuthError::SessionExpiredOrInvalid);
        };

        if session.expires_at <= now {
            self.store.delete_session(token).await?;
            info!(user = %session.user.username, "Expired session removed");
            return Err(AuthError::SessionExpiredOrInvalid);
        }

        Ok(SessionUser::from(session.user))
    }

    pub async fn purge_expired_sessions_at(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        Ok(self.store.purge_expired_sessions(now).await?)
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(
        &self,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let retry_after = self.limiter.cooldown(address);
        if !retry_after.is_zero() {
            metrics::counter!("login_attempts_total", "outcome" => "throttled").increment(1);
            warn!(address = %address, retry_after_ms = retry_after.as_millis(), "Login throttled");
            return Err(AuthError::RateLimited { retry_after });
        }

        let credential = self.store.get_credential(username).await?;

        let (user, verified) = match credential {
            Some(credential) => {
                let ok = Self::verify_blocking(password, credential.password_hash).await?;
                (Some(credential.user), ok)
            }
            None => {
                Self::verify_blocking(password, self.dummy_hash.clone()).await?;
                (None, false)
            }
        };

        let Some(user) = user.filter(|_| verified) else {
            self.limiter.record_failure(address);
            metrics::counter!("login_attempts_total", "outcome" => "failure").increment(1);
            warn!(
                address = %address,
                failures = self.limiter.failure_count(address),
                "Failed login attempt"
            );
            return Err(AuthError::InvalidCredentials);
        };

        self.limiter.reset(address);

        let token = credentials::generate_session_token();
        let expires_at = Utc::now() + self.session_ttl();
        self.store.create_session(&token, user.id, expires_at).await?;

        metrics::counter!("login_attempts_total", "outcome" => "success").increment(1);
        info!(user = %user.username, address = %address, "Admin logged in");

        Ok(IssuedSession {
            token,
            user: SessionUser::from(user),
            expires_at,
        })
    }

    async fn validate_session(&self, token: &str) -> Result<SessionUser, AuthError> {
        self.validate_session_at(token, Utc::now()).await
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.store.delete_session(token).await? {
            info!("Admin logged out");
        }
        Ok(())
    }

    async fn create_user(&self, username: &str, password: &str) -> Result<SessionUser, AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }

        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.store.get_credential(username).await?.is_some() {
            return Err(AuthError::Validation(format!(
                "User '{username}' already exists"
            )));
        }

        let password = password.to_string();
        let security = self.security.clone();
        let hash = task::spawn_blocking(move || credentials::hash_password(&password, &security))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AuthError::Internal(format!("{e:#}")))?;

        let id = self.store.create_user(username, &hash).await?;

        Ok(SessionUser {
            user_id: id,
            username: username.to_string(),
        })
    }

    async fn has_users(&self) -> Result<bool, AuthError> {
        Ok(self.store.has_users().await?)
    }

    async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        self.purge_expired_sessions_at(Utc::now()).await
    }
}
