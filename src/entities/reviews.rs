use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// `albums`, `songs` or `articles`
    pub category: String,

    /// Unique together with `category`
    pub slug: String,

    pub artist: String,

    pub title: String,

    pub subheader: String,

    pub rating: f64,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Path relative to the upload directory, empty when no cover was uploaded
    pub cover_path: String,

    pub article_type: String,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
