//! Pattern-based query parsing

use super::{ParseMethod, ParsedQuery, QueryParser};
use crate::config::QuerySettings;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Tried in order; the first capture wins
static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bin\s+([^,]+,?\s*[a-z]{2})\b",
        r"(?i)\bnear\s+([^,]+)",
        r"(?i)([^,]+,\s*[a-z]{2})\b",
        r"(?i)([a-z\s]+(?:city|town|ville|burg|port))\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("location pattern is valid"))
    .collect()
});

/// Phrases recognized as intents, most specific first
const INTENT_KEYWORDS: &[&str] = &[
    "hidden gems",
    "underground",
    "secret spots",
    "locals only",
    "offbeat",
    "weird",
    "strange",
    "unique",
    "quirky",
    "dive bars",
    "hole in the wall",
    "authentic",
    "indie",
    "alternative",
];

/// Regex and keyword parser
#[derive(Debug, Clone, Default)]
pub struct HeuristicParser {
    settings: QuerySettings,
}

impl HeuristicParser {
    pub fn new(settings: QuerySettings) -> Self {
        Self { settings }
    }

    pub fn parse_sync(&self, input: &str) -> ParsedQuery {
        let location = extract_location(input).unwrap_or_default();

        let lower = input.to_lowercase();
        let intent = INTENT_KEYWORDS
            .iter()
            .find(|k| lower.contains(*k))
            .map(|k| k.to_string())
            .unwrap_or_else(|| self.settings.default_intent.clone());

        let confidence = if location.is_empty() {
            self.settings.heuristic_confidence / 2.0
        } else {
            self.settings.heuristic_confidence
        };

        ParsedQuery {
            location,
            intent,
            confidence,
            method: ParseMethod::Heuristic,
        }
    }
}

fn extract_location(input: &str) -> Option<String> {
    LOCATION_PATTERNS.iter().find_map(|pattern| {
        let captured = pattern.captures(input)?.get(1)?.as_str();
        let cleaned = captured
            .trim()
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .trim();
        (!cleaned.is_empty()).then(|| cleaned.to_string())
    })
}

#[async_trait]
impl QueryParser for HeuristicParser {
    async fn parse(&self, input: &str) -> ParsedQuery {
        self.parse_sync(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> ParsedQuery {
        HeuristicParser::default().parse_sync(input)
    }

    #[test]
    fn test_in_city_state() {
        let parsed = parse("hidden gems in Pikeville KY");
        assert_eq!(parsed.location, "Pikeville KY");
        assert_eq!(parsed.intent, "hidden gems");
        assert_eq!(parsed.confidence, 0.6);
        assert_eq!(parsed.method, ParseMethod::Heuristic);
    }

    #[test]
    fn test_near_pattern() {
        let parsed = parse("cool underground spots near Atlanta?");
        assert_eq!(parsed.location, "Atlanta");
        assert_eq!(parsed.intent, "underground");
    }

    #[test]
    fn test_comma_state_pattern() {
        let parsed = parse("quirky places Asheville, NC");
        assert_eq!(parsed.location, "quirky places Asheville, NC");
        assert_eq!(parsed.intent, "quirky");
    }

    #[test]
    fn test_town_suffix_pattern() {
        let parsed = parse("dive bars around Louisville");
        assert_eq!(parsed.location, "dive bars around Louisville");
        assert_eq!(parsed.intent, "dive bars");
    }

    #[test]
    fn test_async_parse_matches_sync() {
        let parser = HeuristicParser::default();
        let parsed = tokio_test::block_on(parser.parse("offbeat diners near Bristol"));
        assert_eq!(parsed, parser.parse_sync("offbeat diners near Bristol"));
        assert_eq!(parsed.location, "Bristol");
    }

    #[test]
    fn test_no_location() {
        let parsed = parse("something fun");
        assert!(parsed.location.is_empty());
        assert_eq!(parsed.intent, "hidden gems");
        assert_eq!(parsed.confidence, 0.3);
        assert!(!parsed.is_complete());
    }
}
