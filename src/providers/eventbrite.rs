//! Eventbrite events provider

use super::features::extract_features;
use super::traits::*;
use crate::config::ProviderConfig;
use crate::network::{HttpRequest, HttpResponse};
use crate::results::{Candidate, Coordinates, ProviderKind};
use anyhow::Result;
use chrono::{Duration, SecondsFormat, Utc};
use serde::Deserialize;

/// Upcoming local events from the Eventbrite API
pub struct Eventbrite {
    base_url: String,
    token: String,
    limit: u32,
    within: String,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Text {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Logo {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Venue {
    latitude: Option<String>,
    longitude: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    name: Option<Text>,
    description: Option<Text>,
    summary: Option<String>,
    url: String,
    logo: Option<Logo>,
    venue: Option<Venue>,
}

impl Venue {
    fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.latitude.as_deref()?.parse().ok()?;
        let lng = self.longitude.as_deref()?.parse().ok()?;
        Some(Coordinates::new(lat, lng))
    }
}

impl Eventbrite {
    pub fn new() -> Self {
        Self {
            base_url: "https://www.eventbriteapi.com/v3/events/search/".to_string(),
            token: String::new(),
            limit: 20,
            within: "25mi".to_string(),
        }
    }

    fn to_candidate(&self, event: Event) -> Candidate {
        let name = event
            .name
            .and_then(|n| n.text)
            .unwrap_or_else(|| "Unnamed Event".to_string());
        let description = event
            .description
            .and_then(|d| d.text)
            .or(event.summary)
            .unwrap_or_default();
        let has_logo = event.logo.and_then(|l| l.url).is_some();

        // Events are future-facing, so recency is always zero.
        let mut features = extract_features(&event.url, &name, &description, Some(Utc::now()), has_logo);
        features.indie_domain = 1;

        let mut candidate = Candidate::new(name, event.url, self.name(), self.kind())
            .with_description(description)
            .with_features(features)
            .with_source_id(format!("eventbrite_{}", event.id));
        if let Some(coordinates) = event.venue.as_ref().and_then(Venue::coordinates) {
            candidate = candidate.with_coordinates(coordinates);
        }
        candidate
    }
}

impl Default for Eventbrite {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentProvider for Eventbrite {
    fn name(&self) -> &str {
        "eventbrite"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Events
    }

    fn request(&self, params: &FetchParams) -> Result<HttpRequest> {
        let now = Utc::now();
        let mut request = HttpRequest::get(&self.base_url)
            .bearer(&self.token)
            .param("location.address", &params.location)
            .param("location.within", &self.within)
            .param(
                "start_date.range_start",
                now.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .param(
                "start_date.range_end",
                (now + Duration::days(30)).to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .param("sort_by", "relevance")
            .param("expand", "venue")
            .param("page_size", self.limit.to_string());

        if !params.intent.is_empty() {
            request = request.param("q", &params.intent);
        }
        Ok(request)
    }

    fn response(&self, response: HttpResponse, _params: &FetchParams) -> Result<Vec<Candidate>> {
        let body: EventsResponse = response.json()?;
        Ok(body
            .events
            .into_iter()
            .map(|event| self.to_candidate(event))
            .collect())
    }

    fn init(&mut self, config: &ProviderConfig) -> Result<()> {
        if let Some(ref base_url) = config.base_url {
            self.base_url = base_url.clone();
        }
        self.token = config.api_key.clone().unwrap_or_default();
        self.limit = config.limit;
        Ok(())
    }

    fn validate(&self, _config: &ProviderConfig) -> Result<()> {
        if self.token.is_empty() {
            return Err(anyhow::anyhow!(
                "eventbrite requires an api_key (EVENTBRITE_TOKEN)"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_eventbrite_request() {
        let mut eventbrite = Eventbrite::new();
        eventbrite
            .init(&ProviderConfig {
                api_key: Some("tok".to_string()),
                limit: 5,
                ..Default::default()
            })
            .unwrap();

        let request = eventbrite
            .request(&FetchParams::new("Austin, TX", "music"))
            .unwrap();

        assert_eq!(request.headers.get("Authorization").unwrap(), "Bearer tok");
        assert!(request.params.contains(&("q".to_string(), "music".to_string())));
        assert!(request
            .params
            .contains(&("location.address".to_string(), "Austin, TX".to_string())));
    }

    #[test]
    fn test_eventbrite_response() {
        let eventbrite = Eventbrite::new();
        let text = r#"{"events": [
            {"id": "42", "name": {"text": "Underground jazz night"}, "description": {"text": "Local trio"},
             "url": "https://www.eventbrite.com/e/42", "logo": {"url": "https://img.example/l.png"},
             "venue": {"latitude": "30.2672", "longitude": "-97.7431"}},
            {"id": "43", "name": null, "summary": "Open mic", "url": "https://www.eventbrite.com/e/43"}
        ]}"#;
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            text: text.to_string(),
            url: String::new(),
        };

        let candidates = eventbrite
            .response(response, &FetchParams::new("Austin", "music"))
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].domain, "eventbrite.com");
        assert_eq!(candidates[0].features.recency_hours, 0);
        assert_eq!(candidates[0].features.image_present, 1);
        assert_eq!(
            candidates[0].coordinates,
            Some(Coordinates::new(30.2672, -97.7431))
        );
        assert_eq!(candidates[1].name, "Unnamed Event");
        assert_eq!(candidates[1].description, "Open mic");
        assert_eq!(candidates[1].source_kind, ProviderKind::Events);
    }
}
