//! Periodic cleanup of expired sessions and idle login counters.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::{Duration, interval};
use tracing::{error, info};

use crate::config::SecurityConfig;
use crate::services::auth_service::AuthService;
use crate::services::rate_limiter::LoginLimiter;

#[derive(Clone)]
pub struct Maintenance {
    auth: Arc<dyn AuthService>,
    limiter: Arc<LoginLimiter>,
    security: SecurityConfig,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl Maintenance {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthService>,
        limiter: Arc<LoginLimiter>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            auth,
            limiter,
            security,
        }
    }

    /// Spawns both sweep loops. They run until the runtime shuts down.
    pub fn start(&self) {
        let maintenance = self.clone();
        tokio::spawn(async move {
            maintenance.session_loop().await;
        });

        let maintenance = self.clone();
        tokio::spawn(async move {
            maintenance.login_loop().await;
        });
    }

    async fn session_loop(&self) {
        let period = Duration::from_secs(self.security.session_sweep_interval_minutes * 60);
        let mut ticker = interval(period);
        info!(interval_secs = period.as_secs(), "Session sweep loop started");

        loop {
            ticker.tick().await;
            self.sweep_sessions().await;
        }
    }

    async fn login_loop(&self) {
        let period = Duration::from_secs(self.security.login_sweep_interval_minutes * 60);
        let mut ticker = interval(period);
        info!(interval_secs = period.as_secs(), "Login counter sweep loop started");

        loop {
            ticker.tick().await;
            self.sweep_login_attempts();
        }
    }

    /// Deletes expired sessions once. Failures are logged and retried on the next tick.
    pub async fn sweep_sessions(&self) -> u64 {
        let start = Instant::now();
        info!(event = "job_started", job_name = "purge_sessions", "Purging expired sessions");

        match self.auth.purge_expired_sessions().await {
            Ok(removed) => {
                metrics::counter!("sessions_purged_total").increment(removed);
                info!(
                    event = "job_finished",
                    job_name = "purge_sessions",
                    removed,
                    duration_ms = elapsed_ms(start),
                    "Expired sessions purged"
                );
                removed
            }
            Err(e) => {
                error!(event = "job_failed", job_name = "purge_sessions", error = %e, "Session purge failed");
                0
            }
        }
    }

    /// Drops login counters idle longer than the configured window.
    pub fn sweep_login_attempts(&self) -> usize {
        let max_idle = Duration::from_secs(self.security.login_idle_minutes * 60);
        let removed = self.limiter.sweep(max_idle);

        metrics::counter!("login_limiter_swept_total")
            .increment(u64::try_from(removed).unwrap_or(u64::MAX));
        info!(
            event = "job_finished",
            job_name = "sweep_login_attempts",
            removed,
            remaining = self.limiter.tracked_addresses(),
            "Idle login counters dropped"
        );
        removed
    }
}
