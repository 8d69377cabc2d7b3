//! Reddit social-feed provider (public search listing)

use super::features::{count_underground_keywords, extract_features};
use super::traits::*;
use crate::config::ProviderConfig;
use crate::network::{HttpRequest, HttpResponse};
use crate::results::{Candidate, ProviderKind};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const DESCRIPTION_LIMIT: usize = 200;

/// Reddit post search
pub struct Reddit {
    base_url: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    #[serde(default)]
    url: String,
    created_utc: Option<f64>,
    thumbnail: Option<String>,
}

impl Reddit {
    pub fn new() -> Self {
        Self {
            base_url: "https://www.reddit.com/search.json".to_string(),
            limit: 25,
        }
    }

    /// A post is kept when it mentions the location, the theme, or any
    /// offbeat keyword.
    fn is_relevant(text: &str, params: &FetchParams) -> bool {
        let lower = text.to_lowercase();
        let location = params.location.to_lowercase();
        let theme = params.intent.to_lowercase();

        let location_match = location
            .split(|c: char| c.is_whitespace() || c == ',')
            .any(|word| word.len() > 2 && lower.contains(word));
        let theme_match = theme.is_empty() || lower.contains(&theme);

        location_match || theme_match || count_underground_keywords(text) > 0
    }

    fn to_candidate(&self, post: Post) -> Candidate {
        let published = post
            .created_utc
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0));
        let has_image = post
            .thumbnail
            .as_deref()
            .map(|t| t.starts_with("http"))
            .unwrap_or(false);

        let body = if post.selftext.is_empty() {
            post.url.clone()
        } else {
            post.selftext.chars().take(DESCRIPTION_LIMIT).collect()
        };
        let url = format!("https://reddit.com{}", post.permalink);

        let mut features = extract_features(&url, &post.title, &post.selftext, published, has_image);
        features.indie_domain = 1;

        Candidate::new(post.title, url, self.name(), self.kind())
            .with_description(body)
            .with_features(features)
            .with_source_id(format!("reddit_{}", post.id))
    }
}

impl Default for Reddit {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentProvider for Reddit {
    fn name(&self) -> &str {
        "reddit"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::SocialFeed
    }

    fn request(&self, params: &FetchParams) -> Result<HttpRequest> {
        let query = format!("{} {}", params.location, params.intent);
        Ok(HttpRequest::get(&self.base_url)
            .param("q", query.trim())
            .param("sort", "relevance")
            .param("t", "year")
            .param("limit", self.limit.to_string()))
    }

    fn response(&self, response: HttpResponse, params: &FetchParams) -> Result<Vec<Candidate>> {
        let listing: Listing = response.json()?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .filter(|post| Self::is_relevant(&format!("{} {}", post.title, post.selftext), params))
            .map(|post| self.to_candidate(post))
            .collect())
    }

    fn init(&mut self, config: &ProviderConfig) -> Result<()> {
        if let Some(ref base_url) = config.base_url {
            self.base_url = base_url.clone();
        }
        self.limit = config.limit;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HttpClient;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"{
        "data": {"children": [
            {"data": {"id": "a1", "title": "Best hidden spots in Asheville?", "selftext": "Looking for quirky stuff",
                      "permalink": "/r/asheville/comments/a1/", "url": "", "created_utc": 1700000000.0,
                      "thumbnail": "self"}},
            {"data": {"id": "b2", "title": "Tax filing help", "selftext": "", "permalink": "/r/tax/comments/b2/",
                      "url": "https://irs.example", "created_utc": 1700000000.0}}
        ]}
    }"#;

    #[test]
    fn test_relevance_filter() {
        let params = FetchParams::new("Asheville, NC", "murals");
        assert!(Reddit::is_relevant("Asheville murals", &params));
        assert!(Reddit::is_relevant("a secret place", &params));
        assert!(!Reddit::is_relevant("Tax filing help", &params));
    }

    #[tokio::test]
    async fn test_fetch_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "Asheville, NC murals"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let mut reddit = Reddit::new();
        reddit
            .init(&ProviderConfig {
                base_url: Some(format!("{}/search.json", server.uri())),
                limit: 10,
                ..Default::default()
            })
            .unwrap();

        let client = HttpClient::new().unwrap();
        let candidates = reddit
            .fetch(&client, &FetchParams::new("Asheville, NC", "murals"))
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        let post = &candidates[0];
        assert_eq!(post.url, "https://reddit.com/r/asheville/comments/a1/");
        assert_eq!(post.domain, "reddit.com");
        assert_eq!(post.source_id, "reddit_a1");
        assert_eq!(post.source_kind, ProviderKind::SocialFeed);
        assert_eq!(post.features.indie_domain, 1);
        assert_eq!(post.features.image_present, 0);
    }

    #[tokio::test]
    async fn test_fetch_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let mut reddit = Reddit::new();
        reddit
            .init(&ProviderConfig {
                base_url: Some(format!("{}/search.json", server.uri())),
                ..Default::default()
            })
            .unwrap();

        let client = HttpClient::new().unwrap();
        let err = reddit
            .fetch(&client, &FetchParams::new("Asheville", "murals"))
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Http(429));
    }
}
