use crate::models::review::{Category, Review, ReviewInput};
use crate::models::settings::SiteSettings;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::session::SessionRecord;
pub use repositories::user::{Credential, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to `:memory:` would open its own empty database
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        let backend = conn.get_database_backend();
        conn.execute(Statement::from_string(
            backend,
            "PRAGMA journal_mode = WAL".to_string(),
        ))
        .await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn review_repo(&self) -> repositories::review::ReviewRepository {
        repositories::review::ReviewRepository::new(self.conn.clone())
    }

    fn settings_repo(&self) -> repositories::settings::SettingsRepository {
        repositories::settings::SettingsRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    // ========== Review Repository Methods ==========

    pub async fn list_reviews(&self, category: Option<Category>) -> Result<Vec<Review>> {
        self.review_repo().list(category).await
    }

    pub async fn get_review_by_slug(
        &self,
        category: Category,
        slug: &str,
    ) -> Result<Option<Review>> {
        self.review_repo().get_by_slug(category, slug).await
    }

    pub async fn get_review(&self, category: Category, id: i32) -> Result<Option<Review>> {
        self.review_repo().get_by_id(category, id).await
    }

    pub async fn create_review(
        &self,
        category: Category,
        slug: &str,
        input: &ReviewInput,
    ) -> Result<i32> {
        self.review_repo().create(category, slug, input).await
    }

    pub async fn update_review(
        &self,
        category: Category,
        id: i32,
        slug: &str,
        input: &ReviewInput,
    ) -> Result<bool> {
        self.review_repo().update(category, id, slug, input).await
    }

    pub async fn delete_review(&self, category: Category, id: i32) -> Result<bool> {
        self.review_repo().delete(category, id).await
    }

    // ========== Settings Repository Methods ==========

    pub async fn get_settings(&self) -> Result<SiteSettings> {
        self.settings_repo().all().await
    }

    pub async fn update_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings_repo().set(key, value).await
    }

    // ========== User Repository Methods ==========

    pub async fn get_credential(&self, username: &str) -> Result<Option<Credential>> {
        self.user_repo().get_credential(username).await
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<i32> {
        self.user_repo().create(username, password_hash).await
    }

    pub async fn has_users(&self) -> Result<bool> {
        self.user_repo().any_exist().await
    }

    // ========== Session Repository Methods ==========

    pub async fn create_session(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.session_repo()
            .create(token, user_id, expires_at)
            .await
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<SessionRecord>> {
        self.session_repo().get(token).await
    }

    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        self.session_repo().delete(token).await
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        self.session_repo().delete_expired(now).await
    }
}
