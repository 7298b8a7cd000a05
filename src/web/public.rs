use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
};
use serde::Deserialize;

use super::{AppState, WebError, views};
use crate::models::review::Category;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub tab: Option<String>,
}

/// GET /
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Html<String>, WebError> {
    let tab = views::FeedTab::parse(query.tab.as_deref()).ok_or(WebError::NotFound)?;
    let settings = state.store.get_settings().await?;
    let reviews = state.store.list_reviews(tab.category()).await?;

    Ok(views::home(&settings, tab, &reviews))
}

/// GET /music/{category}/{slug}
pub async fn show_review(
    State(state): State<AppState>,
    Path((category, slug)): Path<(String, String)>,
) -> Result<Html<String>, WebError> {
    let category: Category = category.parse().map_err(|_| WebError::NotFound)?;

    let review = state
        .store
        .get_review_by_slug(category, &slug)
        .await?
        .ok_or(WebError::NotFound)?;

    let settings = state.store.get_settings().await?;
    Ok(views::review_page(&settings, &review))
}

pub async fn not_found() -> impl IntoResponse {
    WebError::NotFound
}
