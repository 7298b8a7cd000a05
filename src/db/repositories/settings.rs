use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::entities::{prelude::*, settings};
use crate::models::settings::{SiteSettings, is_allowed_key};

pub struct SettingsRepository {
    conn: DatabaseConnection,
}

impl SettingsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn all(&self) -> Result<SiteSettings> {
        let rows = Settings::find()
            .all(&self.conn)
            .await
            .context("Failed to load settings")?;

        Ok(SiteSettings::with_overrides(
            rows.into_iter().map(|row| (row.key, row.value)),
        ))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        if !is_allowed_key(key) {
            anyhow::bail!("Unknown setting: {key}");
        }

        let active = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
        };

        Settings::insert(active)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_column(settings::Column::Value)
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .with_context(|| format!("Failed to save setting {key}"))?;

        Ok(())
    }
}
