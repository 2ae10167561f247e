use std::env;
use std::time::Duration;

/// Backend ceiling on documents per `put_multi` call.
pub const MAX_BATCH_SIZE: usize = 200;

/// Tunables for the caching and write pipeline, loaded from `SEARCHGATE_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Lifetime of a cached search response.
    pub result_ttl: Duration,
    /// Lifetime of a generation token.
    pub generation_ttl: Duration,
    /// Delay before the second generation bump after a write.
    pub reset_delay: Duration,
    /// Documents per backend write call (1..=200).
    pub batch_size: usize,
    /// Cap on concurrently running write chunks per request; 0 = unbounded.
    pub max_inflight_batches: usize,
    /// Backend result limit when the query does not set one.
    pub default_search_limit: usize,
    /// Route the deferred reset callback is posted to.
    pub reset_route: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            result_ttl: Duration::from_secs(12 * 3600),
            generation_ttl: Duration::from_secs(12 * 3600),
            reset_delay: Duration::from_secs(60),
            batch_size: MAX_BATCH_SIZE,
            max_inflight_batches: 0,
            default_search_limit: 20,
            reset_route: "/api/search/reset".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = GatewayConfig::default();
        GatewayConfig {
            result_ttl: env_parse("SEARCHGATE_RESULT_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.result_ttl),
            generation_ttl: env_parse("SEARCHGATE_GENERATION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.generation_ttl),
            reset_delay: env_parse("SEARCHGATE_RESET_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.reset_delay),
            batch_size: env_parse::<usize>("SEARCHGATE_BATCH_SIZE")
                .map(|n| n.clamp(1, MAX_BATCH_SIZE))
                .unwrap_or(defaults.batch_size),
            max_inflight_batches: env_parse("SEARCHGATE_MAX_INFLIGHT_BATCHES")
                .unwrap_or(defaults.max_inflight_batches),
            default_search_limit: env_parse("SEARCHGATE_SEARCH_LIMIT")
                .unwrap_or(defaults.default_search_limit),
            reset_route: defaults.reset_route,
        }
    }
}
