use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entities::{prelude::*, reviews};
use crate::models::review::{Category, Review, ReviewInput};
use crate::services::slug::SlugIndex;

/// Repository for reviews and articles
pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: reviews::Model) -> Result<Review> {
        let category = model
            .category
            .parse::<Category>()
            .with_context(|| format!("Review {} has an invalid category", model.id))?;

        Ok(Review {
            id: model.id,
            category,
            slug: model.slug,
            artist: model.artist,
            title: model.title,
            subheader: model.subheader,
            rating: model.rating,
            body: model.body,
            cover_path: model.cover_path,
            article_type: model.article_type,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    /// Newest first. `None` lists every category (the home feed).
    pub async fn list(&self, category: Option<Category>) -> Result<Vec<Review>> {
        let mut query = Reviews::find();
        if let Some(category) = category {
            query = query.filter(reviews::Column::Category.eq(category.as_str()));
        }

        let rows = query
            .order_by_desc(reviews::Column::CreatedAt)
            .order_by_desc(reviews::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list reviews")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn get_by_slug(&self, category: Category, slug: &str) -> Result<Option<Review>> {
        let row = Reviews::find()
            .filter(reviews::Column::Category.eq(category.as_str()))
            .filter(reviews::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query review by slug")?;

        row.map(Self::map_model).transpose()
    }

    pub async fn get_by_id(&self, category: Category, id: i32) -> Result<Option<Review>> {
        let row = Reviews::find_by_id(id)
            .filter(reviews::Column::Category.eq(category.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query review by ID")?;

        row.map(Self::map_model).transpose()
    }

    pub async fn create(&self, category: Category, slug: &str, input: &ReviewInput) -> Result<i32> {
        let now = Utc::now();
        let active = reviews::ActiveModel {
            category: Set(category.as_str().to_string()),
            slug: Set(slug.to_string()),
            artist: Set(input.artist.clone()),
            title: Set(input.title.clone()),
            subheader: Set(input.subheader.clone()),
            rating: Set(input.rating),
            body: Set(input.body.clone()),
            cover_path: Set(input.cover_path.clone()),
            article_type: Set(input.article_type.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let res = Reviews::insert(active)
            .exec(&self.conn)
            .await
            .with_context(|| format!("Failed to insert {category} entry '{slug}'"))?;

        info!(category = %category, slug = %slug, id = res.last_insert_id, "Created entry");
        Ok(res.last_insert_id)
    }

    /// Returns false when no entry with that id exists in the category.
    pub async fn update(
        &self,
        category: Category,
        id: i32,
        slug: &str,
        input: &ReviewInput,
    ) -> Result<bool> {
        let Some(existing) = Reviews::find_by_id(id)
            .filter(reviews::Column::Category.eq(category.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to load review for update")?
        else {
            return Ok(false);
        };

        let mut active: reviews::ActiveModel = existing.into();
        active.slug = Set(slug.to_string());
        active.artist = Set(input.artist.clone());
        active.title = Set(input.title.clone());
        active.subheader = Set(input.subheader.clone());
        active.rating = Set(input.rating);
        active.body = Set(input.body.clone());
        active.cover_path = Set(input.cover_path.clone());
        active.article_type = Set(input.article_type.clone());
        active.updated_at = Set(Utc::now());
        active
            .update(&self.conn)
            .await
            .with_context(|| format!("Failed to update {category} entry {id}"))?;

        info!(category = %category, slug = %slug, id, "Updated entry");
        Ok(true)
    }

    pub async fn delete(&self, category: Category, id: i32) -> Result<bool> {
        let result = Reviews::delete_many()
            .filter(reviews::Column::Id.eq(id))
            .filter(reviews::Column::Category.eq(category.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to delete review")?;

        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl SlugIndex for ReviewRepository {
    async fn slug_taken(
        &self,
        category: Category,
        slug: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool> {
        let mut query = Reviews::find()
            .filter(reviews::Column::Category.eq(category.as_str()))
            .filter(reviews::Column::Slug.eq(slug));

        if let Some(id) = exclude_id {
            query = query.filter(reviews::Column::Id.ne(id));
        }

        let count = query
            .count(&self.conn)
            .await
            .context("Failed to probe slug")?;

        Ok(count > 0)
    }
}
