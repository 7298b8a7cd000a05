//! Server-rendered HTML pages.
//!
//! Every string that did not come from the template itself goes through
//! `html_escape`. Review bodies are the exception: they are admin-authored HTML
//! and are emitted verbatim.

use std::fmt::Write;

use axum::http::StatusCode;
use axum::response::Html;
use chrono::{Datelike, Utc};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::models::review::{ARTICLE_TYPES, Category, Review};
use crate::models::settings::{ACCENT_COLOR, NAV_BG_COLOR, PAGE_BG_COLOR, SiteSettings};
use crate::services::SessionUser;

/// Which slice of the feed the home page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTab {
    All,
    Only(Category),
}

impl FeedTab {
    /// Missing, empty and `all` mean the full feed; anything else must name a category.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("" | "all") => Some(Self::All),
            Some(tab) => tab.parse().ok().map(Self::Only),
        }
    }

    #[must_use]
    pub const fn category(self) -> Option<Category> {
        match self {
            Self::All => None,
            Self::Only(category) => Some(category),
        }
    }
}

fn layout(
    settings: &SiteSettings,
    page_title: &str,
    admin: Option<&SessionUser>,
    body: &str,
) -> Html<String> {
    let site_title = settings.site_title();
    let full_title = if page_title.is_empty() {
        text(site_title).into_owned()
    } else {
        format!("{} | {}", text(page_title), text(site_title))
    };

    let style = format!(
        "--nav-bg: {}; --page-bg: {}; --accent: {};",
        settings.get(NAV_BG_COLOR),
        settings.get(PAGE_BG_COLOR),
        settings.get(ACCENT_COLOR),
    );

    let mut nav = String::new();
    for category in Category::ALL {
        let _ = write!(
            nav,
            r#"<a href="/?tab={}">{}</a>"#,
            category.as_str(),
            category.plural()
        );
    }

    let admin_bar = admin.map_or_else(String::new, |user| {
        format!(
            r#"<div class="admin-bar">Signed in as {} · <a href="/admin/">Dashboard</a> · <a href="/admin/reviews/new">New</a> · <a href="/admin/settings">Settings</a>
<form method="post" action="/admin/logout" class="inline"><button type="submit">Log out</button></form></div>"#,
            text(&user.username)
        )
    });

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{full_title}</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body style="{style}">
<header class="site-nav"><a class="brand" href="/">{brand}</a><nav>{nav}</nav></header>
{admin_bar}
<main>
{body}
</main>
<footer>© {year} {brand}</footer>
</body>
</html>"#,
        style = attr(&style),
        brand = text(site_title),
        year = Utc::now().year(),
    ))
}

fn rating_badge(review: &Review) -> String {
    if review.category.is_article() {
        return String::new();
    }
    let class = if review.is_high_rating() {
        "rating high"
    } else {
        "rating"
    };
    format!(r#"<span class="{class}">{:.1}</span>"#, review.rating)
}

fn cover_img(review: &Review) -> String {
    if review.cover_path.is_empty() {
        return String::new();
    }
    format!(
        r#"<img class="cover" src="/uploads/{}" alt="{}">"#,
        attr(&review.cover_path),
        attr(&review.title)
    )
}

fn byline(review: &Review) -> String {
    if review.category.is_article() {
        if review.article_type.is_empty() {
            return String::new();
        }
        return format!(r#"<span class="kind">{}</span>"#, text(&review.article_type));
    }
    format!(r#"<span class="artist">{}</span>"#, text(&review.artist))
}

fn review_card(review: &Review) -> String {
    format!(
        r#"<article class="card {category}">
<a href="{href}">{cover}</a>
<div class="card-body">{byline}
<h2><a href="{href}">{title}</a></h2>
<p class="subheader">{subheader}</p>{rating}</div>
</article>"#,
        category = review.category.as_str(),
        href = attr(&review.permalink()),
        cover = cover_img(review),
        byline = byline(review),
        title = text(&review.title),
        subheader = text(&review.subheader),
        rating = rating_badge(review),
    )
}

#[must_use]
pub fn home(settings: &SiteSettings, tab: FeedTab, reviews: &[Review]) -> Html<String> {
    let mut body = String::from(r#"<div class="tabs">"#);
    let _ = write!(
        body,
        r#"<a href="/?tab=all" class="{}">All</a>"#,
        if tab == FeedTab::All { "active" } else { "" }
    );
    for category in Category::ALL {
        let active = if tab == FeedTab::Only(category) { "active" } else { "" };
        let _ = write!(
            body,
            r#"<a href="/?tab={}" class="{active}">{}</a>"#,
            category.as_str(),
            category.plural()
        );
    }
    body.push_str("</div>\n<section class=\"feed\">");

    if reviews.is_empty() {
        body.push_str(r#"<p class="empty">Nothing here yet.</p>"#);
    }
    for review in reviews {
        body.push_str(&review_card(review));
    }
    body.push_str("</section>");

    let title = tab.category().map_or("", Category::plural);
    layout(settings, title, None, &body)
}

#[must_use]
pub fn review_page(settings: &SiteSettings, review: &Review) -> Html<String> {
    let body = format!(
        r#"<article class="entry {category}">
{cover}
<header>{byline}
<h1>{title}</h1>
<p class="subheader">{subheader}</p>{rating}
<p class="meta">{kind} · <time datetime="{iso}">{date}</time></p>
</header>
<div class="entry-body">{content}</div>
</article>"#,
        category = review.category.as_str(),
        cover = cover_img(review),
        byline = byline(review),
        title = text(&review.title),
        subheader = text(&review.subheader),
        rating = rating_badge(review),
        kind = review.category.singular(),
        iso = review.created_at.to_rfc3339(),
        date = review.created_at.format("%B %-d, %Y"),
        content = review.body,
    );

    layout(settings, &review.title, None, &body)
}

#[must_use]
pub fn login_page(settings: &SiteSettings, error: Option<&str>) -> Html<String> {
    let body = format!(
        r#"<section class="form-page">
<h1>Admin login</h1>
{error}
<form method="post" action="/admin/login">
<label>Username <input type="text" name="username" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required></label>
<button type="submit">Log in</button>
</form>
</section>"#,
        error = error_banner(error),
    );
    layout(settings, "Log in", None, &body)
}

#[must_use]
pub fn setup_page(settings: &SiteSettings, error: Option<&str>) -> Html<String> {
    let body = format!(
        r#"<section class="form-page">
<h1>Welcome to Ditchfork</h1>
<p>Create the admin account to finish setup.</p>
{error}
<form method="post" action="/setup">
<label>Username <input type="text" name="username" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="new-password" minlength="8" required></label>
<label>Confirm password <input type="password" name="password_confirm" autocomplete="new-password" minlength="8" required></label>
<label>Site title <input type="text" name="site_title" placeholder="{placeholder}"></label>
<button type="submit">Create admin</button>
</form>
</section>"#,
        error = error_banner(error),
        placeholder = attr(settings.site_title()),
    );
    layout(settings, "Setup", None, &body)
}

fn error_banner(error: Option<&str>) -> String {
    error.map_or_else(String::new, |msg| {
        format!(r#"<p class="error">{}</p>"#, text(msg))
    })
}

#[must_use]
pub fn dashboard(settings: &SiteSettings, user: &SessionUser, reviews: &[Review]) -> Html<String> {
    let mut rows = String::new();
    for review in reviews {
        let _ = write!(
            rows,
            r#"<tr><td>{kind}</td><td>{artist}</td><td><a href="{href}">{title}</a></td><td>{date}</td>
<td><a href="/admin/{category}/{id}/edit">Edit</a>
<form method="post" action="/admin/{category}/{id}/delete" class="inline"><button type="submit">Delete</button></form></td></tr>"#,
            kind = review.category.singular(),
            artist = text(&review.artist),
            href = attr(&review.permalink()),
            title = text(&review.title),
            date = review.created_at.format("%Y-%m-%d"),
            category = review.category.as_str(),
            id = review.id,
        );
    }

    let body = format!(
        r#"<section class="admin">
<h1>Dashboard</h1>
<p><a class="button" href="/admin/reviews/new">New entry</a></p>
<table>
<thead><tr><th>Type</th><th>Artist</th><th>Title</th><th>Published</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#
    );
    layout(settings, "Dashboard", Some(user), &body)
}

/// Values shown in the review editor. On a failed save these are what the
/// admin typed, not what is stored.
#[derive(Debug, Clone, Default)]
pub struct ReviewFormValues {
    pub category: Option<Category>,
    pub artist: String,
    pub title: String,
    pub subheader: String,
    pub rating: String,
    pub body: String,
    pub article_type: String,
    pub cover_path: String,
}

impl From<&Review> for ReviewFormValues {
    fn from(review: &Review) -> Self {
        Self {
            category: Some(review.category),
            artist: review.artist.clone(),
            title: review.title.clone(),
            subheader: review.subheader.clone(),
            rating: review.rating.to_string(),
            body: review.body.clone(),
            article_type: review.article_type.clone(),
            cover_path: review.cover_path.clone(),
        }
    }
}

/// Editor for a new entry (`editing = None`) or an existing one.
#[must_use]
pub fn review_form(
    settings: &SiteSettings,
    user: &SessionUser,
    editing: Option<(Category, i32)>,
    values: &ReviewFormValues,
    error: Option<&str>,
) -> Html<String> {
    let (heading, action, category_field) = match editing {
        Some((category, id)) => (
            format!("Edit {}", category.singular().to_lowercase()),
            format!("/admin/{}/{id}", category.as_str()),
            format!(
                r#"<p class="meta">{}</p>"#,
                category.singular()
            ),
        ),
        None => {
            let mut options = String::new();
            for category in Category::ALL {
                let selected = if values.category == Some(category) {
                    " selected"
                } else {
                    ""
                };
                let _ = write!(
                    options,
                    r#"<option value="{}"{selected}>{}</option>"#,
                    category.as_str(),
                    category.singular()
                );
            }
            (
                "New entry".to_string(),
                "/admin/reviews".to_string(),
                format!(r#"<label>Type <select name="category">{options}</select></label>"#),
            )
        }
    };

    let mut article_options = String::from(r#"<option value="">(none)</option>"#);
    for kind in ARTICLE_TYPES {
        let selected = if values.article_type == *kind { " selected" } else { "" };
        let _ = write!(article_options, r#"<option value="{kind}"{selected}>{kind}</option>"#);
    }

    let current_cover = if values.cover_path.is_empty() {
        String::new()
    } else {
        format!(
            r#"<img class="cover thumb" src="/uploads/{}" alt="Current cover">"#,
            attr(&values.cover_path)
        )
    };

    let body = format!(
        r#"<section class="admin form-page">
<h1>{heading}</h1>
{error}
<form method="post" action="{action}" enctype="multipart/form-data">
{category_field}
<label>Artist <input type="text" name="artist" value="{artist}"></label>
<label>Title <input type="text" name="title" value="{title}" required></label>
<label>Subheader <input type="text" name="subheader" value="{subheader}"></label>
<label>Rating <input type="number" name="rating" value="{rating}" min="0" max="10" step="0.1"></label>
<label>Article type <select name="article_type">{article_options}</select></label>
<label>Body <textarea name="body" rows="16">{body}</textarea></label>
{current_cover}
<label>Cover image <input type="file" name="cover" accept="image/jpeg,image/png,image/webp"></label>
<button type="submit">Save</button>
</form>
</section>"#,
        heading = text(&heading),
        error = error_banner(error),
        action = attr(&action),
        artist = attr(&values.artist),
        title = attr(&values.title),
        subheader = attr(&values.subheader),
        rating = attr(&values.rating),
        body = text(&values.body),
    );

    layout(settings, &heading, Some(user), &body)
}

#[must_use]
pub fn settings_page(
    settings: &SiteSettings,
    user: &SessionUser,
    saved: bool,
    error: Option<&str>,
) -> Html<String> {
    let mut fields = String::new();
    for (key, value) in settings.iter() {
        let _ = write!(
            fields,
            r#"<label>{label} <input type="text" name="{key}" value="{value}"></label>"#,
            label = text(&key.replace('_', " ")),
            key = attr(key),
            value = attr(value),
        );
    }

    let notice = if saved {
        r#"<p class="notice">Settings saved.</p>"#
    } else {
        ""
    };

    let body = format!(
        r#"<section class="admin form-page">
<h1>Site settings</h1>
{notice}{error}
<form method="post" action="/admin/settings">
{fields}
<p class="meta">Leave a field empty to keep its current value.</p>
<button type="submit">Save</button>
</form>
</section>"#,
        error = error_banner(error),
    );

    layout(settings, "Settings", Some(user), &body)
}

/// Standalone page for error responses when site settings may be unavailable.
#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<section class="error-page"><h1>{} {}</h1><p>{}</p><p><a href="/">Back to the front page</a></p></section>"#,
        status.as_u16(),
        text(reason),
        text(message)
    );
    layout(&SiteSettings::default(), reason, None, &body)
}
