//! Text signals shared by all providers when building candidates

use crate::results::CandidateFeatures;
use chrono::{DateTime, Utc};
use url::Url;

/// Hours assumed when a source gives no usable date
pub const DEFAULT_RECENCY_HOURS: u64 = 168;

const WORDS_PER_MINUTE: usize = 200;

const UNDERGROUND_KEYWORDS: &[&str] = &[
    "hidden",
    "secret",
    "underground",
    "locals",
    "offbeat",
    "unique",
    "undiscovered",
    "gem",
    "insider",
    "off the beaten path",
    "lesser known",
    "dive",
    "hole in the wall",
    "authentic",
    "quirky",
    "weird",
    "strange",
    "underrated",
    "tucked away",
];

const CORPORATE_DOMAINS: &[&str] = &[
    "tripadvisor.com",
    "expedia.com",
    "booking.com",
    "hotels.com",
    "kayak.com",
    "priceline.com",
    "orbitz.com",
    "travelocity.com",
    "yelp.com",
    "foursquare.com",
    "facebook.com",
    "instagram.com",
    "wikipedia.org",
    "wikimedia.org",
];

/// Host of a URL without a leading `www.`; empty when the URL does not parse
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
        .unwrap_or_default()
}

/// True unless the URL belongs to a large travel/review aggregator
pub fn is_indie_domain(url: &str) -> bool {
    let domain = extract_domain(url);
    !CORPORATE_DOMAINS.iter().any(|corp| domain.contains(corp))
}

/// Number of distinct offbeat-flavoured keywords present in the text
pub fn count_underground_keywords(text: &str) -> u32 {
    let lower = text.to_lowercase();
    UNDERGROUND_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count() as u32
}

/// Reading time at 200 words per minute, at least one minute
pub fn estimate_reading_minutes(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Whole hours since `published`, clamped at zero
pub fn recency_hours(published: Option<DateTime<Utc>>) -> u64 {
    match published {
        Some(at) => (Utc::now() - at).num_hours().max(0) as u64,
        None => DEFAULT_RECENCY_HOURS,
    }
}

/// Assemble the feature block for a candidate
pub fn extract_features(
    url: &str,
    title: &str,
    body: &str,
    published: Option<DateTime<Utc>>,
    image_present: bool,
) -> CandidateFeatures {
    CandidateFeatures {
        recency_hours: recency_hours(published),
        underground_keyword_hits: count_underground_keywords(&format!("{} {}", title, body)),
        indie_domain: u8::from(is_indie_domain(url)),
        image_present: u8::from(image_present),
        est_reading_minutes: estimate_reading_minutes(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.Example.com/path"), "example.com");
        assert_eq!(extract_domain("not a url"), "");
    }

    #[test]
    fn test_indie_domain() {
        assert!(is_indie_domain("https://smalltownblog.net/post"));
        assert!(!is_indie_domain("https://www.tripadvisor.com/Attraction"));
    }

    #[test]
    fn test_underground_keywords() {
        assert_eq!(count_underground_keywords("A hidden, quirky dive bar"), 3);
        assert_eq!(count_underground_keywords("City hall"), 0);
    }

    #[test]
    fn test_reading_minutes() {
        assert_eq!(estimate_reading_minutes(""), 1);
        let long = "word ".repeat(401);
        assert_eq!(estimate_reading_minutes(&long), 3);
    }

    #[test]
    fn test_recency() {
        assert_eq!(recency_hours(None), DEFAULT_RECENCY_HOURS);
        let hours = recency_hours(Some(Utc::now() - Duration::hours(5)));
        assert!((4..=5).contains(&hours));
        assert_eq!(recency_hours(Some(Utc::now() + Duration::hours(5))), 0);
    }
}
