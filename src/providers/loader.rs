//! Provider loader for initializing providers from configuration

use super::registry::ProviderRegistry;
use super::traits::ContentProvider;
use super::{eventbrite, reddit, serpapi};
use crate::config::{ProviderConfig, Settings};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for initializing providers from configuration
pub struct ProviderLoader;

impl ProviderLoader {
    /// Load all enabled providers from settings. Providers that fail
    /// validation (usually a missing key) are skipped with a warning.
    pub fn load(settings: &Settings) -> Result<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();

        for config in &settings.providers {
            if config.disabled {
                info!("Skipping disabled provider: {}", config.name);
                continue;
            }

            match Self::create_provider(&config.provider, config) {
                Ok(provider) => {
                    info!("Loaded provider: {} ({})", config.name, config.provider);
                    registry.register(provider, config.clone());
                }
                Err(e) => {
                    warn!("Failed to load provider {}: {}", config.name, e);
                }
            }
        }

        if registry.len() < 3 {
            warn!(
                "Only {} content providers loaded; results will be thin",
                registry.len()
            );
        }
        Ok(registry)
    }

    /// Create a provider instance by type
    fn create_provider(
        provider_type: &str,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ContentProvider>> {
        let mut provider: Box<dyn ContentProvider> = match provider_type {
            "serpapi" => Box::new(serpapi::SerpApi::new()),
            "reddit" => Box::new(reddit::Reddit::new()),
            "eventbrite" => Box::new(eventbrite::Eventbrite::new()),
            _ => {
                return Err(anyhow::anyhow!("Unknown provider type: {}", provider_type));
            }
        };

        provider.init(config)?;
        provider.validate(config)?;

        Ok(Arc::from(provider))
    }

    /// Get list of available provider types
    pub fn available_providers() -> Vec<&'static str> {
        vec!["serpapi", "reddit", "eventbrite"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_skips_unkeyed_providers() {
        let settings = Settings::default();
        let registry = ProviderLoader::load(&settings).unwrap();

        // reddit needs no key; serpapi and eventbrite do
        assert_eq!(registry.names(), vec!["reddit"]);
    }

    #[test]
    fn test_load_with_keys_and_disabled() {
        let mut settings = Settings::default();
        for provider in settings.providers.iter_mut() {
            provider.api_key = Some("key".to_string());
        }
        settings.providers[1].disabled = true;

        let registry = ProviderLoader::load(&settings).unwrap();
        assert_eq!(registry.names(), vec!["serpapi", "eventbrite"]);
    }

    #[test]
    fn test_unknown_provider_type() {
        let config = ProviderConfig {
            name: "yelp".to_string(),
            provider: "yelp".to_string(),
            ..Default::default()
        };
        assert!(ProviderLoader::create_provider("yelp", &config).is_err());
    }
}
