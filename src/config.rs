//! Engine-wide tunables (spec.md §2.3, §4.1, §4.7), validated the way the
//! teacher validates `ServerConfig` — a `validator`-derived struct with a
//! `Default` impl, rather than an env/CLI/YAML loading layer this engine
//! has no host process to read from.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Tunables a host may adjust per `Runner` (spec.md §4.1 parser cache
/// capacity, §4.7 optimizer fixpoint bound).
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct EngineConfig {
    /// LRU capacity of the parsed-query cache (spec.md §4.1 "default ≥ 256").
    #[validate(range(min = 1, message = "parser cache capacity must be at least 1"))]
    pub parser_cache_capacity: usize,

    /// Maximum full passes the physical optimizer runs before giving up on
    /// reaching a fixpoint (spec.md §4.7 "bound ≥ 10 iterations").
    #[validate(range(min = 1, message = "optimizer fixpoint bound must be at least 1"))]
    pub optimizer_fixpoint_bound: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            parser_cache_capacity: crate::parser::DEFAULT_CACHE_CAPACITY,
            optimizer_fixpoint_bound: 10,
        }
    }
}

impl EngineConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parser_cache_capacity, 256);
        assert_eq!(config.optimizer_fixpoint_bound, 10);
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let config = EngineConfig {
            parser_cache_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_fixpoint_bound_is_rejected() {
        let config = EngineConfig {
            optimizer_fixpoint_bound: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
