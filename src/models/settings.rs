use std::collections::BTreeMap;

pub const SITE_TITLE: &str = "site_title";
pub const NAV_BG_COLOR: &str = "nav_bg_color";
pub const PAGE_BG_COLOR: &str = "page_bg_color";
pub const ACCENT_COLOR: &str = "accent_color";

/// Every writable setting with its default value.
pub const DEFAULTS: &[(&str, &str)] = &[
    (SITE_TITLE, "Ditchfork"),
    (NAV_BG_COLOR, "#111111"),
    (PAGE_BG_COLOR, "#ffffff"),
    (ACCENT_COLOR, "#d62828"),
];

#[must_use]
pub fn is_allowed_key(key: &str) -> bool {
    DEFAULTS.iter().any(|(k, _)| *k == key)
}

/// Resolved site settings: defaults overlaid with stored values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    values: BTreeMap<String, String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            values: DEFAULTS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

impl SiteSettings {
    /// Overlays stored rows; unknown keys are ignored.
    #[must_use]
    pub fn with_overrides<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Self::default();
        for (key, value) in rows {
            if is_allowed_key(&key) {
                settings.values.insert(key, value);
            }
        }
        settings
    }

    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    #[must_use]
    pub fn site_title(&self) -> &str {
        self.get(SITE_TITLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
