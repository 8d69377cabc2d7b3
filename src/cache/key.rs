//! Cache key derivation

use sha2::{Digest, Sha256};

/// A (query, location) pair addressed by every tier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub location: String,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
        }
    }

    /// Key for the in-process tier
    pub fn memory_key(&self) -> String {
        format!("{}|{}", self.query.to_lowercase(), self.location.to_lowercase())
    }

    /// Deterministic hash used by the persistent tiers
    pub fn exact_key(&self) -> String {
        let normalized = format!(
            "{}|{}",
            self.query.trim().to_lowercase(),
            self.location.trim().to_lowercase()
        );
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn has_location(&self) -> bool {
        !self.location.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_key_lowercases() {
        let key = CacheKey::new("Hidden Gems", "Pikeville, KY");
        assert_eq!(key.memory_key(), "hidden gems|pikeville, ky");
    }

    #[test]
    fn test_exact_key_normalizes() {
        let a = CacheKey::new("  Hidden Gems ", "Pikeville");
        let b = CacheKey::new("hidden gems", "PIKEVILLE ");
        assert_eq!(a.exact_key(), b.exact_key());
        assert_eq!(a.exact_key().len(), 64);
        assert_ne!(a.exact_key(), CacheKey::new("hidden gems", "Hazard").exact_key());
    }
}
