use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use tracing::info;

use crate::entities::{prelude::*, users};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
}

/// Credential record as stored, including the password hash.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: User,
    pub password_hash: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Exact, case-sensitive lookup
    pub async fn get_credential(&self, username: &str) -> Result<Option<Credential>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            Credential {
                user: User::from(u),
                password_hash,
            }
        }))
    }

    pub async fn create(&self, username: &str, password_hash: &str) -> Result<i32> {
        let active = users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let res = Users::insert(active)
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to create user '{username}'"))?;

        info!(user = %username, "Created admin user");
        Ok(res.last_insert_id)
    }

    pub async fn any_exist(&self) -> Result<bool> {
        let count = Users::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")?;

        Ok(count > 0)
    }
}
