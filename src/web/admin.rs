use std::collections::HashMap;

use axum::{
    Form,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::info;

use super::views::{self, ReviewFormValues};
use super::{AppState, WebError};
use crate::models::review::{ARTICLE_TYPES, Category, Review, ReviewInput};
use crate::models::settings::{SiteSettings, is_allowed_key};
use crate::services::{SessionUser, UploadError, allocate_unique};

const DASHBOARD_PATH: &str = "/admin/";

// ============================================================================
// Review form
// ============================================================================

#[derive(Debug)]
pub struct CoverUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Raw multipart fields of the review editor.
#[derive(Debug, Default)]
pub struct ReviewForm {
    pub category: String,
    pub artist: String,
    pub title: String,
    pub subheader: String,
    pub rating: String,
    pub body: String,
    pub article_type: String,
    pub cover: Option<CoverUpload>,
}

impl ReviewForm {
    async fn read(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "cover" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.cover = Some(CoverUpload {
                    file_name,
                    content_type,
                    bytes,
                });
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "category" => form.category = value,
                "artist" => form.artist = value,
                "title" => form.title = value,
                "subheader" => form.subheader = value,
                "rating" => form.rating = value,
                "body" => form.body = value,
                "article_type" => form.article_type = value,
                _ => {}
            }
        }

        Ok(form)
    }

    fn values(&self, category: Option<Category>, cover_path: &str) -> ReviewFormValues {
        ReviewFormValues {
            category,
            artist: self.artist.clone(),
            title: self.title.clone(),
            subheader: self.subheader.clone(),
            rating: self.rating.clone(),
            body: self.body.clone(),
            article_type: self.article_type.clone(),
            cover_path: cover_path.to_string(),
        }
    }
}

/// Checks the editor fields for `category` and normalizes them into a
/// [`ReviewInput`]. The cover path is left empty for the caller to fill in.
pub fn validate_review(category: Category, form: &ReviewForm) -> Result<ReviewInput, String> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err("Title is required".to_string());
    }

    if category.is_article() {
        let article_type = form.article_type.trim();
        if !article_type.is_empty() && !ARTICLE_TYPES.contains(&article_type) {
            return Err(format!("Unknown article type '{article_type}'"));
        }

        return Ok(ReviewInput {
            artist: String::new(),
            title: title.to_string(),
            subheader: form.subheader.trim().to_string(),
            rating: 0.0,
            body: form.body.clone(),
            cover_path: String::new(),
            article_type: article_type.to_string(),
        });
    }

    let artist = form.artist.trim();
    if artist.is_empty() {
        return Err("Artist is required".to_string());
    }

    let max = category.max_rating();
    let raw_rating = form.rating.trim();
    let rating = if raw_rating.is_empty() {
        0.0
    } else {
        raw_rating
            .parse::<f64>()
            .map_err(|_| "Rating must be a number".to_string())?
    };
    if !(0.0..=max).contains(&rating) {
        return Err(format!("Rating must be between 0 and {max}"));
    }

    Ok(ReviewInput {
        artist: artist.to_string(),
        title: title.to_string(),
        subheader: form.subheader.trim().to_string(),
        rating,
        body: form.body.clone(),
        cover_path: String::new(),
        article_type: String::new(),
    })
}

fn invalid_form(
    settings: &SiteSettings,
    user: &SessionUser,
    editing: Option<(Category, i32)>,
    values: &ReviewFormValues,
    message: &str,
) -> Response {
    (
        StatusCode::BAD_REQUEST,
        views::review_form(settings, user, editing, values, Some(message)),
    )
        .into_response()
}

/// Stores the uploaded cover, if one was chosen. `Ok(Err(_))` is a problem
/// with the file itself and is reported back on the form.
async fn store_cover(
    state: &AppState,
    form: &ReviewForm,
) -> Result<Result<Option<String>, String>, WebError> {
    let Some(cover) = &form.cover else {
        return Ok(Ok(None));
    };

    match state
        .uploads
        .save(
            cover.file_name.as_deref(),
            cover.content_type.as_deref(),
            &cover.bytes,
        )
        .await
    {
        Ok(path) => Ok(Ok(path)),
        Err(err @ UploadError::Io(_)) => Err(err.into()),
        Err(err) => Ok(Err(err.to_string())),
    }
}

/// Removes a cover written for a save that did not reach the database.
async fn discard_cover(state: &AppState, stored: Option<&str>) {
    if let Some(path) = stored {
        state.uploads.remove(path).await;
    }
}

fn parse_category(raw: &str) -> Result<Category, WebError> {
    raw.parse().map_err(|_| WebError::NotFound)
}

async fn load_review(state: &AppState, category: &str, id: i32) -> Result<Review, WebError> {
    let category = parse_category(category)?;
    state
        .store
        .get_review(category, id)
        .await?
        .ok_or(WebError::NotFound)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /admin/
pub async fn dashboard(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Html<String>, WebError> {
    let settings = state.store.get_settings().await?;
    let reviews = state.store.list_reviews(None).await?;
    Ok(views::dashboard(&settings, &user, &reviews))
}

/// GET /admin/reviews/new
pub async fn new_review_form(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Html<String>, WebError> {
    let settings = state.store.get_settings().await?;
    let values = ReviewFormValues {
        category: Some(Category::Albums),
        ..ReviewFormValues::default()
    };
    Ok(views::review_form(&settings, &user, None, &values, None))
}

/// POST /admin/reviews
pub async fn create_review(
    State(state): State<AppState>,
    user: SessionUser,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let form = ReviewForm::read(multipart).await?;
    let settings = state.store.get_settings().await?;

    let Ok(category) = form.category.parse::<Category>() else {
        let values = form.values(None, "");
        return Ok(invalid_form(&settings, &user, None, &values, "Choose an entry type"));
    };

    let mut input = match validate_review(category, &form) {
        Ok(input) => input,
        Err(msg) => {
            let values = form.values(Some(category), "");
            return Ok(invalid_form(&settings, &user, None, &values, &msg));
        }
    };

    let slug = allocate_unique(
        &state.store.review_repo(),
        category,
        &input.artist,
        &input.title,
        None,
    )
    .await?;

    let stored = match store_cover(&state, &form).await? {
        Ok(path) => path,
        Err(msg) => {
            let values = form.values(Some(category), "");
            return Ok(invalid_form(&settings, &user, None, &values, &msg));
        }
    };
    input.cover_path = stored.clone().unwrap_or_default();

    let id = match state.store.create_review(category, &slug, &input).await {
        Ok(id) => id,
        Err(err) => {
            discard_cover(&state, stored.as_deref()).await;
            return Err(err.into());
        }
    };
    info!(user = %user.username, category = %category, id, slug = %slug, "Entry published");

    Ok(Redirect::to(DASHBOARD_PATH).into_response())
}

/// GET /admin/{category}/{id}/edit
pub async fn edit_review_form(
    State(state): State<AppState>,
    user: SessionUser,
    Path((category, id)): Path<(String, i32)>,
) -> Result<Html<String>, WebError> {
    let review = load_review(&state, &category, id).await?;
    let settings = state.store.get_settings().await?;

    Ok(views::review_form(
        &settings,
        &user,
        Some((review.category, review.id)),
        &ReviewFormValues::from(&review),
        None,
    ))
}

/// POST /admin/{category}/{id}
pub async fn update_review(
    State(state): State<AppState>,
    user: SessionUser,
    Path((category, id)): Path<(String, i32)>,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let existing = load_review(&state, &category, id).await?;
    let category = existing.category;
    let editing = Some((category, id));

    let form = ReviewForm::read(multipart).await?;
    let settings = state.store.get_settings().await?;

    let mut input = match validate_review(category, &form) {
        Ok(input) => input,
        Err(msg) => {
            let values = form.values(Some(category), &existing.cover_path);
            return Ok(invalid_form(&settings, &user, editing, &values, &msg));
        }
    };

    let slug = allocate_unique(
        &state.store.review_repo(),
        category,
        &input.artist,
        &input.title,
        Some(id),
    )
    .await?;

    let stored = match store_cover(&state, &form).await? {
        Ok(path) => path,
        Err(msg) => {
            let values = form.values(Some(category), &existing.cover_path);
            return Ok(invalid_form(&settings, &user, editing, &values, &msg));
        }
    };
    input.cover_path = stored.clone().unwrap_or(existing.cover_path);

    match state.store.update_review(category, id, &slug, &input).await {
        Ok(true) => {}
        Ok(false) => {
            discard_cover(&state, stored.as_deref()).await;
            return Err(WebError::NotFound);
        }
        Err(err) => {
            discard_cover(&state, stored.as_deref()).await;
            return Err(err.into());
        }
    }
    info!(user = %user.username, category = %category, id, slug = %slug, "Entry updated");

    Ok(Redirect::to(DASHBOARD_PATH).into_response())
}

/// POST /admin/{category}/{id}/delete
pub async fn delete_review(
    State(state): State<AppState>,
    user: SessionUser,
    Path((category, id)): Path<(String, i32)>,
) -> Result<Response, WebError> {
    let category = parse_category(&category)?;

    if !state.store.delete_review(category, id).await? {
        return Err(WebError::NotFound);
    }
    info!(user = %user.username, category = %category, id, "Entry deleted");

    Ok(Redirect::to(DASHBOARD_PATH).into_response())
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub saved: Option<String>,
}

/// GET /admin/settings
pub async fn settings_form(
    State(state): State<AppState>,
    user: SessionUser,
    Query(query): Query<SettingsQuery>,
) -> Result<Html<String>, WebError> {
    let settings = state.store.get_settings().await?;
    Ok(views::settings_page(
        &settings,
        &user,
        query.saved.is_some(),
        None,
    ))
}

/// POST /admin/settings
///
/// Empty values keep the stored setting. Any unknown key rejects the whole form.
pub async fn save_settings(
    State(state): State<AppState>,
    user: SessionUser,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, WebError> {
    if let Some(unknown) = fields.keys().find(|key| !is_allowed_key(key)) {
        let settings = state.store.get_settings().await?;
        let message = format!("Unknown setting '{unknown}'");
        return Ok((
            StatusCode::BAD_REQUEST,
            views::settings_page(&settings, &user, false, Some(&message)),
        )
            .into_response());
    }

    let mut changed = 0;
    for (key, value) in &fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        state.store.update_setting(key, value).await?;
        changed += 1;
    }
    info!(user = %user.username, changed, "Site settings saved");

    Ok(Redirect::to("/admin/settings?saved=1").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(artist: &str, title: &str, rating: &str) -> ReviewForm {
        ReviewForm {
            artist: artist.to_string(),
            title: title.to_string(),
            rating: rating.to_string(),
            ..ReviewForm::default()
        }
    }

    #[test]
    fn test_title_required_everywhere() {
        for category in Category::ALL {
            let err = validate_review(category, &form("Artist", "   ", "5")).unwrap_err();
            assert_eq!(err, "Title is required");
        }
    }

    #[test]
    fn test_artist_required_for_rated_categories() {
        assert!(validate_review(Category::Albums, &form("", "Title", "5")).is_err());
        assert!(validate_review(Category::Songs, &form(" ", "Title", "5")).is_err());
        assert!(validate_review(Category::Articles, &form("", "Title", "")).is_ok());
    }

    #[test]
    fn test_rating_bounds() {
        let ok = validate_review(Category::Albums, &form("A", "T", "10")).unwrap();
        assert!((ok.rating - 10.0).abs() < f64::EPSILON);

        let ok = validate_review(Category::Songs, &form("A", "T", "")).unwrap();
        assert!(ok.rating.abs() < f64::EPSILON);

        assert!(validate_review(Category::Albums, &form("A", "T", "10.1")).is_err());
        assert!(validate_review(Category::Albums, &form("A", "T", "-1")).is_err());
        assert!(validate_review(Category::Albums, &form("A", "T", "great")).is_err());
        assert!(validate_review(Category::Albums, &form("A", "T", "NaN")).is_err());
    }

    #[test]
    fn test_articles_are_normalized() {
        let mut article = form("Someone", "Year in review", "9");
        article.article_type = "List".to_string();

        let input = validate_review(Category::Articles, &article).unwrap();
        assert_eq!(input.artist, "");
        assert!(input.rating.abs() < f64::EPSILON);
        assert_eq!(input.article_type, "List");

        article.article_type = "Gossip".to_string();
        assert!(validate_review(Category::Articles, &article).is_err());
    }

    #[test]
    fn test_article_type_dropped_for_reviews() {
        let mut review = form("Artist", "Title", "7.5");
        review.article_type = "News".to_string();
        let input = validate_review(Category::Albums, &review).unwrap();
        assert_eq!(input.article_type, "");
        assert_eq!(input.artist, "Artist");
    }
}
