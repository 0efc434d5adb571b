//! Process configuration, loaded from CLI flags and environment variables.

use clap::Parser;
use newsgrid_core::Tier;

/// newsgrid server configuration.
///
/// Every field can be set via its environment variable (`clap`'s `env`
/// attribute); CLI flags take precedence when both are supplied.
#[derive(Debug, Clone, Parser)]
#[command(name = "newsgrid-server", version, about)]
pub struct AppConfig {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Shared secret required in the `X-Api-Key` header on trigger requests.
    #[arg(long, env = "NEWSGRID_API_KEY")]
    pub api_key: String,

    /// Bind host for the HTTP trigger API.
    #[arg(long, env = "NEWSGRID_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port for the HTTP trigger API.
    #[arg(long, env = "NEWSGRID_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Default subscription tier applied to runs that don't specify one.
    #[arg(long, env = "NEWSGRID_DEFAULT_TIER", default_value = "standard")]
    pub default_tier: TierArg,

    /// Maximum number of fetches in flight across all domains.
    #[arg(long, env = "NEWSGRID_FETCH_GLOBAL_CONCURRENCY", default_value_t = 50)]
    pub fetch_global_concurrency: usize,

    /// Maximum number of fetches in flight per domain.
    #[arg(long, env = "NEWSGRID_FETCH_PER_DOMAIN_CONCURRENCY", default_value_t = 4)]
    pub fetch_per_domain_concurrency: usize,

    /// Polite delay applied after a successful fetch, before the per-domain
    /// semaphore permit is released.
    #[arg(long, env = "NEWSGRID_FETCH_POLITE_DELAY_MS", default_value_t = 250)]
    pub fetch_polite_delay_ms: u64,

    /// Maximum `Retry-After` value the fetcher will honor, in seconds.
    #[arg(long, env = "NEWSGRID_FETCH_MAX_RETRY_AFTER_SECS", default_value_t = 60)]
    pub fetch_max_retry_after_secs: u64,

    /// Consecutive fetch failures before a domain's circuit breaker opens.
    #[arg(long, env = "NEWSGRID_CIRCUIT_BREAKER_THRESHOLD", default_value_t = 5)]
    pub circuit_breaker_threshold: u32,

    /// Cooldown, in seconds, before a tripped circuit breaker is retried.
    #[arg(long, env = "NEWSGRID_CIRCUIT_BREAKER_COOLDOWN_SECS", default_value_t = 300)]
    pub circuit_breaker_cooldown_secs: u64,

    /// Requests per minute allowed to the LLM summarization backend.
    #[arg(long, env = "NEWSGRID_LLM_RPM", default_value_t = 60)]
    pub llm_rate_limit_rpm: u32,

    /// Number of feed entries processed per batch chunk during ingest.
    #[arg(long, env = "NEWSGRID_INGEST_CHUNK_SIZE", default_value_t = 100)]
    pub ingest_chunk_size: usize,

    /// Age, in hours, after which a `running` run is considered stale and
    /// marked failed by the sweep job.
    #[arg(long, env = "NEWSGRID_STALE_RUN_MAX_AGE_HOURS", default_value_t = 2)]
    pub stale_run_max_age_hours: i64,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, env = "NEWSGRID_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

/// CLI-parseable wrapper around [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierArg(pub Tier);

impl std::str::FromStr for TierArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(TierArg(Tier::Basic)),
            "standard" => Ok(TierArg(Tier::Standard)),
            "premium" => Ok(TierArg(Tier::Premium)),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

impl std::fmt::Display for TierArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self.0 {
            Tier::Basic => "basic",
            Tier::Standard => "standard",
            Tier::Premium => "premium",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_required_env_and_flags() {
        let config = AppConfig::parse_from([
            "newsgrid-server",
            "--database-url",
            "postgres://localhost/newsgrid",
            "--api-key",
            "secret",
        ]);
        assert_eq!(config.database_url, "postgres://localhost/newsgrid");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.port, 8080);
        assert_eq!(config.ingest_chunk_size, 100);
    }

    #[test]
    fn tier_arg_parses_known_values() {
        assert_eq!("basic".parse::<TierArg>().unwrap().0, Tier::Basic);
        assert_eq!("PREMIUM".parse::<TierArg>().unwrap().0, Tier::Premium);
        assert!("bogus".parse::<TierArg>().is_err());
    }
}
