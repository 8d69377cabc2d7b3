//! Provider registry for managing configured content providers

use super::traits::ContentProvider;
use crate::config::ProviderConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of content providers in registration order
pub struct ProviderRegistry {
    /// Providers in the order they were registered
    providers: Vec<Arc<dyn ContentProvider>>,
    /// Provider configurations by name
    configs: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            configs: HashMap::new(),
        }
    }

    /// Register a provider. A provider with the same name is replaced in place.
    pub fn register(&mut self, provider: Arc<dyn ContentProvider>, config: ProviderConfig) {
        let name = provider.name().to_string();

        if let Some(slot) = self.providers.iter_mut().find(|p| p.name() == name) {
            *slot = provider;
        } else {
            self.providers.push(provider);
        }
        self.configs.insert(name, config);
    }

    /// Get a provider by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ContentProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Get provider config
    pub fn get_config(&self, name: &str) -> Option<&ProviderConfig> {
        self.configs.get(name)
    }

    /// All providers in registration order
    pub fn all(&self) -> &[Arc<dyn ContentProvider>] {
        &self.providers
    }

    /// Get all provider names
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Check if a provider exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Get effective timeout for a provider in seconds
    pub fn get_timeout(&self, name: &str, default: f64) -> f64 {
        self.configs
            .get(name)
            .and_then(|c| c.timeout)
            .or_else(|| self.get(name).map(|p| p.timeout()))
            .unwrap_or(default)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::reddit::Reddit;

    #[test]
    fn test_registry() {
        let mut registry = ProviderRegistry::new();
        let reddit = Arc::new(Reddit::new()) as Arc<dyn ContentProvider>;
        let config = ProviderConfig {
            name: "reddit".to_string(),
            provider: "reddit".to_string(),
            timeout: Some(3.0),
            ..Default::default()
        };

        registry.register(reddit, config);

        assert!(registry.contains("reddit"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_timeout("reddit", 5.0), 3.0);
        assert_eq!(registry.get_timeout("missing", 5.0), 5.0);
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Reddit::new()), ProviderConfig::default());
        registry.register(Arc::new(Reddit::new()), ProviderConfig::default());
        assert_eq!(registry.names(), vec!["reddit"]);
    }
}
