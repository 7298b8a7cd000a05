//! URL slugs for entries.
//!
//! A slug is derived from artist and title at write time and must be unique
//! within its category. Collisions get a numeric suffix: `x-y`, `x-y-2`, `x-y-3`.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::review::Category;

const PLACEHOLDER: &str = "untitled";

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("valid slug regex"));

static DASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("valid dash regex"));

/// Existence probe used by [`allocate_unique`].
#[async_trait]
pub trait SlugIndex: Send + Sync {
    /// Whether `slug` is used in `category` by any entry other than `exclude_id`.
    async fn slug_taken(
        &self,
        category: Category,
        slug: &str,
        exclude_id: Option<i32>,
    ) -> Result<bool>;
}

#[must_use]
pub fn slugify(artist: &str, title: &str) -> String {
    let joined = format!("{artist}-{title}").to_lowercase();
    let replaced = NON_SLUG_CHARS.replace_all(&joined, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");
    let trimmed = collapsed.trim_matches('-');

    if trimmed.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// First free slug for `artist`/`title` in `category`.
///
/// Pass the entry's own id as `exclude_id` when re-slugging on edit so it does
/// not collide with itself. The probe and the later insert are not atomic; the
/// `(category, slug)` unique index rejects the loser of a concurrent race.
pub async fn allocate_unique<I>(
    index: &I,
    category: Category,
    artist: &str,
    title: &str,
    exclude_id: Option<i32>,
) -> Result<String>
where
    I: SlugIndex + ?Sized,
{
    let base = slugify(artist, title);
    if !index.slug_taken(category, &base, exclude_id).await? {
        return Ok(base);
    }

    let mut suffix: u64 = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !index.slug_taken(category, &candidate, exclude_id).await? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}
