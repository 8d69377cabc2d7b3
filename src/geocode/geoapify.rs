//! Geoapify forward geocoding

use super::{Geocoder, ResolvedLocation};
use crate::config::GeoapifySettings;
use crate::network::{HttpClient, HttpRequest};
use crate::results::Coordinates;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Properties {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    region: Option<String>,
    country: Option<String>,
    formatted: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    rank: Option<Rank>,
}

#[derive(Debug, Default, Deserialize)]
struct Rank {
    confidence: Option<f64>,
}

impl Properties {
    /// "City, State, Country" from whichever parts are present
    fn normalized(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.city.as_ref().or(self.town.as_ref()).or(self.village.as_ref()),
            self.state.as_ref().or(self.region.as_ref()),
            self.country.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();

        if parts.is_empty() {
            self.formatted.clone()
        } else {
            Some(parts.join(", "))
        }
    }
}

pub struct Geoapify {
    client: HttpClient,
    settings: GeoapifySettings,
}

impl Geoapify {
    pub fn new(client: HttpClient, settings: GeoapifySettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl Geocoder for Geoapify {
    async fn resolve(&self, raw: &str) -> Result<Option<ResolvedLocation>> {
        let request = HttpRequest::get(&self.settings.base_url)
            .param("text", raw)
            .param("limit", "1")
            .param("apiKey", self.settings.api_key.as_str());

        let collection: FeatureCollection = self.client.execute(request).await?.error_for_status()?.json()?;

        let Some(feature) = collection.features.into_iter().next() else {
            return Ok(None);
        };
        let props = feature.properties;
        let Some(normalized) = props.normalized() else {
            return Ok(None);
        };

        let coordinates = match (props.lat, props.lon) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        };

        Ok(Some(ResolvedLocation {
            normalized,
            confidence: props
                .rank
                .and_then(|r| r.confidence)
                .unwrap_or(DEFAULT_CONFIDENCE),
            coordinates,
        }))
    }
}
