// =============================================================================
// Central Application State
// =============================================================================
//
// The single source of truth shared by every operation via `Arc<AppState>`:
// the loaded configuration, the TTL cache in front of the provider, the
// provider client itself, and the stateless trend scorer.

use std::time::Instant;

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::error::Result;
use crate::provider::ProviderClient;
use crate::scorer::TrendScorer;

/// Shared application state. Cheap to share; all interior mutability lives
/// inside the cache.
pub struct AppState {
    pub config: AppConfig,
    pub cache: TtlCache,
    pub provider: ProviderClient,
    pub scorer: TrendScorer,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let provider = ProviderClient::new(config.provider.clone())?;
        let cache = TtlCache::new(config.cache_ttl.clone());
        let scorer = TrendScorer::new(config.score_weights.clone());
        Ok(Self {
            config,
            cache,
            provider,
            scorer,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_builds_from_default_config() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert_eq!(state.cache.stats().total_entries, 0);
    }
}
