use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, sessions};

use super::user::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        token: &str,
        user_id: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let active = sessions::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        };

        Sessions::insert(active)
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert session")?;

        Ok(())
    }

    /// A session whose owning user no longer exists is reported as absent.
    pub async fn get(&self, token: &str) -> Result<Option<SessionRecord>> {
        let row = Sessions::find_by_id(token.to_string())
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query session")?;

        Ok(row.and_then(|(session, user)| {
            user.map(|u| SessionRecord {
                token: session.token,
                user: User::from(u),
                expires_at: session.expires_at,
            })
        }))
    }

    pub async fn delete(&self, token: &str) -> Result<bool> {
        let result = Sessions::delete_by_id(token.to_string())
            .exec(&self.conn)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected > 0)
    }

    /// Deletes every session with `expires_at <= now`.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = Sessions::delete_many()
            .filter(sessions::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired sessions")?;

        Ok(result.rows_affected)
    }
}
