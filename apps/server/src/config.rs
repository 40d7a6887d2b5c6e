use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use tickerlens_market_data::MarketDataConfig;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub market_data: MarketDataConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("TL_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()
            .context("Invalid TL_LISTEN_ADDR")?;
        let cors_allow = std::env::var("TL_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = match std::env::var("TL_REQUEST_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid TL_REQUEST_TIMEOUT_MS: {raw}"))?,
            Err(_) => 60000,
        };

        let defaults = MarketDataConfig::default();
        let mut market_data = defaults
            .clone()
            .with_min_request_interval(env_seconds(
                "YF_REQUEST_INTERVAL",
                defaults.min_request_interval,
            )?)
            .with_cache_ttl(env_seconds("YF_CACHE_TTL", defaults.cache_ttl)?);
        if let Ok(raw) = std::env::var("YF_MAX_RETRIES") {
            let retries = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid YF_MAX_RETRIES: {raw}"))?;
            market_data = market_data.with_max_retries(retries);
        }

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            market_data,
        })
    }

    /// How long a handler waits on the market data client. Always below the
    /// HTTP request timeout.
    pub fn upstream_deadline(&self) -> Duration {
        self.request_timeout.saturating_sub(self.request_timeout / 10)
    }
}

/// Reads a (possibly fractional) number of seconds, e.g. `0.2`.
fn env_seconds(name: &str, default: Duration) -> anyhow::Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => parse_seconds(&raw).with_context(|| format!("Invalid {name}: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_seconds(raw: &str) -> anyhow::Result<Duration> {
    let secs: f64 = raw.trim().parse()?;
    Duration::try_from_secs_f64(secs).map_err(anyhow::Error::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_seconds() {
        assert_eq!(parse_seconds("0.2").unwrap(), Duration::from_millis(200));
        assert_eq!(parse_seconds(" 300 ").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn upstream_deadline_is_under_request_timeout() {
        let config = Config {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
            market_data: MarketDataConfig::default(),
        };
        assert_eq!(config.upstream_deadline(), Duration::from_secs(54));
    }

    #[test]
    fn rejects_bad_request_timeout() {
        std::env::set_var("TL_REQUEST_TIMEOUT_MS", "soon");
        let result = Config::from_env();
        std::env::remove_var("TL_REQUEST_TIMEOUT_MS");

        let err = result.err().unwrap();
        assert!(err.to_string().contains("TL_REQUEST_TIMEOUT_MS"), "{err}");
    }

    #[test]
    fn rejects_bad_seconds() {
        assert!(parse_seconds("soon").is_err());
        assert!(parse_seconds("-1").is_err());
    }
}
