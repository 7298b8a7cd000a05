use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Article kinds offered by the admin form. Empty means unspecified.
pub const ARTICLE_TYPES: &[&str] = &["News", "Opinion", "List"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Albums,
    Songs,
    Articles,
}

impl Category {
    /// Display order for tabs and menus.
    pub const ALL: [Self; 3] = [Self::Albums, Self::Songs, Self::Articles];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Albums => "albums",
            Self::Songs => "songs",
            Self::Articles => "articles",
        }
    }

    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Albums => "Album",
            Self::Songs => "Song",
            Self::Articles => "Article",
        }
    }

    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Albums => "Albums",
            Self::Songs => "Songs",
            Self::Articles => "Articles",
        }
    }

    /// Segment used in public `/music/{category}/{slug}` URLs.
    #[must_use]
    pub const fn url_path(self) -> &'static str {
        self.as_str()
    }

    /// Upper bound of the rating scale; zero for unrated categories.
    #[must_use]
    pub const fn max_rating(self) -> f64 {
        match self {
            Self::Albums | Self::Songs => 10.0,
            Self::Articles => 0.0,
        }
    }

    #[must_use]
    pub const fn is_article(self) -> bool {
        matches!(self, Self::Articles)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i32,
    pub category: Category,
    pub slug: String,
    pub artist: String,
    pub title: String,
    pub subheader: String,
    pub rating: f64,
    pub body: String,
    pub cover_path: String,
    pub article_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Public URL of the entry page.
    #[must_use]
    pub fn permalink(&self) -> String {
        format!("/music/{}/{}", self.category.url_path(), self.slug)
    }

    /// Ratings at or above 80% of the scale are highlighted.
    #[must_use]
    pub fn is_high_rating(&self) -> bool {
        let max = self.category.max_rating();
        max > 0.0 && self.rating / max >= 0.8
    }
}

/// Editable fields of a review. The slug is derived, never supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewInput {
    pub artist: String,
    pub title: String,
    pub subheader: String,
    pub rating: f64,
    pub body: String,
    pub cover_path: String,
    pub article_type: String,
}
