//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_KEEP_UNUSED_FOR_SECS: u64 = 60;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every read goes to the network and nothing is retained.
    pub enabled: bool,
    /// How long an entry without subscribers survives before it is pruned.
    pub keep_unused_for: Duration,
    /// Maximum events applied per dispatch.
    pub consume_batch_limit: NonZeroUsize,
    /// Also invalidate `Product:LIST` when a single product is updated.
    pub invalidate_lists_on_update: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_unused_for: Duration::from_secs(DEFAULT_KEEP_UNUSED_FOR_SECS),
            consume_batch_limit: NonZeroUsize::new(DEFAULT_CONSUME_BATCH_LIMIT)
                .unwrap_or(NonZeroUsize::MIN),
            invalidate_lists_on_update: false,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            keep_unused_for: settings.keep_unused_for,
            consume_batch_limit: settings.consume_batch_limit,
            invalidate_lists_on_update: settings.invalidate_lists_on_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.keep_unused_for, Duration::from_secs(60));
        assert_eq!(config.consume_batch_limit.get(), 100);
        assert!(!config.invalidate_lists_on_update);
    }
}
