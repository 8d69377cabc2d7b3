//! Keyword tables for the app-fit sub-score

/// Places the app should not recommend. Checked before anything else.
pub const LOW_FIT: &[&str] = &[
    "funeral",
    "hospital",
    "clinic",
    "medical",
    "office",
    "corporate",
    "insurance",
    "bank",
    "finance",
    "legal",
    "law",
    "adult",
    "explicit",
    "logistics",
    "warehouse",
    "industrial",
    "utility",
    "government",
    "police",
    "fire",
    "emergency",
    "private",
    "restricted",
];

pub const HIGH_FIT: &[&str] = &[
    "museum",
    "gallery",
    "park",
    "historic",
    "landmark",
    "tour",
    "attraction",
    "festival",
    "event",
    "market",
    "cafe",
    "restaurant",
    "bar",
    "brewery",
    "distillery",
    "winery",
    "trail",
    "hike",
    "adventure",
    "experience",
    "art",
    "music",
    "theater",
    "performance",
    "culture",
    "nightlife",
    "local",
    "unique",
];

/// Solemn places that fit only when framed as history or a tour
pub const MEDIUM_FIT: &[&str] = &["cemetery", "graveyard", "memorial"];

pub const HISTORIC_MARKERS: &[&str] = &["historic", "tour"];

pub const SOCIAL_DOMAINS: &[&str] = &["reddit", "blog"];

pub const EVENT_DOMAINS: &[&str] = &["eventbrite"];

/// True when any keyword occurs as a substring of `text`
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
