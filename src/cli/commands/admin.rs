//! Admin account command handlers

use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;
use crate::services::rate_limiter::LoginLimiter;
use crate::services::{AuthService, SeaOrmAuthService, credentials};

/// Splits `username:password` on the first colon, so passwords may contain colons.
pub fn parse_credentials(raw: &str) -> anyhow::Result<(&str, &str)> {
    let (username, password) = raw
        .split_once(':')
        .context("Credentials must be given as username:password")?;

    if username.trim().is_empty() {
        anyhow::bail!("Username must not be empty");
    }

    Ok((username.trim(), password))
}

pub async fn cmd_init_admin(config: &Config, raw: &str) -> anyhow::Result<()> {
    let (username, password) = parse_credentials(raw)?;

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let auth = SeaOrmAuthService::new(
        store,
        Arc::new(LoginLimiter::new()),
        config.security.clone(),
    )?;

    let user = auth.create_user(username, password).await?;

    println!("✓ Created admin '{}' (id {})", user.username, user.user_id);
    Ok(())
}

pub fn cmd_hash_password(config: &Config, password: &str) -> anyhow::Result<()> {
    let hash = credentials::hash_password(password, &config.security)?;
    println!("{hash}");
    Ok(())
}
