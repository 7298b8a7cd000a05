use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, LoginLimiter, SeaOrmAuthService, UploadStore};

pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub auth: Arc<dyn AuthService>,

    pub limiter: Arc<LoginLimiter>,

    pub uploads: UploadStore,

    pub prometheus_handle: Option<PrometheusHandle>,

    /// Latches to true once an admin account exists; never reset.
    setup_complete: AtomicBool,
}

impl SharedState {
    pub async fn new(
        config: Config,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let limiter = Arc::new(LoginLimiter::new());
        let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            Arc::clone(&limiter),
            config.security.clone(),
        )?);

        let setup_complete = auth.has_users().await?;
        if !setup_complete {
            info!("No admin account yet; all pages redirect to /setup");
        }

        let uploads = UploadStore::new(
            &config.storage.upload_dir,
            config.storage.max_upload_bytes,
        );

        Ok(Self {
            config,
            store,
            auth,
            limiter,
            uploads,
            prometheus_handle,
            setup_complete: AtomicBool::new(setup_complete),
        })
    }

    /// Whether an admin exists. Asks the database until the answer is yes.
    pub async fn setup_complete(&self) -> anyhow::Result<bool> {
        if self.setup_complete.load(Ordering::Acquire) {
            return Ok(true);
        }

        let exists = self.auth.has_users().await?;
        if exists {
            self.mark_setup_complete();
        }
        Ok(exists)
    }

    pub fn mark_setup_complete(&self) {
        self.setup_complete.store(true, Ordering::Release);
    }
}
