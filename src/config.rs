// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the customer directory database | `/data` |
//! | `INDEXER_API_BASE_URL` | Blockchain indexing API | Required |
//! | `INDEXER_API_KEY` | Indexer API key | Optional |
//! | `RECEIVING_ADDRESS` | Address payments must be sent to | Required |
//! | `MIN_CONFIRMATIONS` | Confirmations before a transfer counts | `12` |
//! | `PROCESSOR_API_BASE_URL` | Card payment processor API | Required |
//! | `PROCESSOR_API_KEY` | Processor API key | Optional |
//! | `PRICE_API_BASE_URL` | Token/fiat spot rate API | Required |
//! | `PRICE_BASE_ASSET` | Token symbol quoted by the rate API | `AVAX` |
//! | `PRICE_QUOTE_CURRENCY` | Reference currency code | `EUR` |
//! | `PRICE_FALLBACK_RATE_MINOR` | Fallback rate, minor units per token | Required |
//! | `PRICE_PER_DAY_MINOR` | Cost of one day of access, minor units | `100` |
//! | `LAPSE_THRESHOLD_SECS` | Grace period before a lapse resets the window | `259200` (3 days) |
//! | `TOKEN_DECIMALS` | Native token decimal places | `18` |
//! | `SOURCE_TIMEOUT_SECS` | Per-source fetch timeout | `5` |
//! | `CACHE_TTL_SECS` | Source cache freshness window | `60` |
//! | `CACHE_CAPACITY` | Source cache entries | `1024` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use url::Url;

use crate::models::WalletAddress;
use crate::pricing::RateSourceConfig;
use crate::sources::{ChainIndexerConfig, ProcessorConfig};

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Transfers requested per indexer page.
const INDEXER_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid configuration value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Pricing and window policy injected at the resolver boundary.
///
/// Explicitly constructed and passed in; no part of the core reads ambient
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct EntitlementPolicy {
    /// Cost of one day of access in reference-currency minor units.
    pub price_per_day_minor: u64,
    /// Grace period after expiry within which a payment still stacks.
    pub lapse_threshold: Duration,
    /// Decimal places of the native token (18 for wei-denominated chains).
    pub token_decimals: u32,
}

impl Default for EntitlementPolicy {
    fn default() -> Self {
        Self {
            price_per_day_minor: 100,
            lapse_threshold: Duration::days(3),
            token_decimals: 18,
        }
    }
}

/// Full service configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub indexer: ChainIndexerConfig,
    pub processor: ProcessorConfig,
    pub rate_source: RateSourceConfig,
    pub fallback_rate_minor: u64,
    pub policy: EntitlementPolicy,
    pub source_timeout: StdDuration,
    pub cache_ttl: StdDuration,
    pub cache_capacity: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", "0.0.0.0");
        let port = parse_env("PORT", 8080)?;
        let data_dir = PathBuf::from(env_or_default(DATA_DIR_ENV, "/data"));

        let indexer = ChainIndexerConfig {
            base_url: env_base_url("INDEXER_API_BASE_URL")?,
            api_key: env_optional("INDEXER_API_KEY"),
            receiving_address: env_wallet_address("RECEIVING_ADDRESS")?,
            min_confirmations: parse_env("MIN_CONFIRMATIONS", 12)?,
            page_size: INDEXER_PAGE_SIZE,
        };

        let processor = ProcessorConfig {
            base_url: env_base_url("PROCESSOR_API_BASE_URL")?,
            api_key: env_optional("PROCESSOR_API_KEY"),
        };

        let rate_source = RateSourceConfig {
            base_url: env_base_url("PRICE_API_BASE_URL")?,
            base_asset: env_or_default("PRICE_BASE_ASSET", "AVAX"),
            quote_currency: env_or_default("PRICE_QUOTE_CURRENCY", "EUR"),
            quote_exponent: 2,
        };

        let fallback_rate_minor = env_required("PRICE_FALLBACK_RATE_MINOR")?
            .parse()
            .map_err(|_| invalid("PRICE_FALLBACK_RATE_MINOR", "expected an integer"))?;

        let price_per_day_minor: u64 = parse_env("PRICE_PER_DAY_MINOR", 100)?;
        if price_per_day_minor == 0 {
            return Err(invalid("PRICE_PER_DAY_MINOR", "must be greater than zero"));
        }

        let policy = EntitlementPolicy {
            price_per_day_minor,
            lapse_threshold: Duration::seconds(parse_env("LAPSE_THRESHOLD_SECS", 259_200)?),
            token_decimals: parse_env("TOKEN_DECIMALS", 18)?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            indexer,
            processor,
            rate_source,
            fallback_rate_minor,
            policy,
            source_timeout: StdDuration::from_secs(parse_env("SOURCE_TIMEOUT_SECS", 5)?),
            cache_ttl: StdDuration::from_secs(parse_env("CACHE_TTL_SECS", 60)?),
            cache_capacity: parse_env("CACHE_CAPACITY", 1024)?,
        })
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_required(name: &str) -> Result<String, ConfigError> {
    env_optional(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env_optional(name) {
        Some(value) => value
            .parse()
            .map_err(|_| invalid(name, "failed to parse value")),
        None => Ok(default),
    }
}

fn env_base_url(name: &str) -> Result<String, ConfigError> {
    let raw = env_required(name)?;
    Url::parse(&raw).map_err(|e| invalid(name, &format!("not a valid URL: {e}")))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn env_wallet_address(name: &str) -> Result<WalletAddress, ConfigError> {
    let raw = env_required(name)?;
    WalletAddress::parse(&raw).map_err(|e| invalid(name, &e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_sane() {
        let policy = EntitlementPolicy::default();
        assert_eq!(policy.price_per_day_minor, 100);
        assert_eq!(policy.lapse_threshold, Duration::days(3));
        assert_eq!(policy.token_decimals, 18);
    }

    #[test]
    fn env_optional_treats_blank_as_unset() {
        std::env::set_var("ENTITLEMENT_TEST_BLANK", "   ");
        assert_eq!(env_optional("ENTITLEMENT_TEST_BLANK"), None);
        std::env::remove_var("ENTITLEMENT_TEST_BLANK");
    }

    #[test]
    fn env_base_url_rejects_garbage() {
        std::env::set_var("ENTITLEMENT_TEST_URL", "not a url");
        assert!(env_base_url("ENTITLEMENT_TEST_URL").is_err());

        std::env::set_var("ENTITLEMENT_TEST_URL", "https://indexer.example.com/");
        assert_eq!(
            env_base_url("ENTITLEMENT_TEST_URL").unwrap(),
            "https://indexer.example.com"
        );
        std::env::remove_var("ENTITLEMENT_TEST_URL");
    }

    #[test]
    fn env_wallet_address_validates_format() {
        std::env::set_var("ENTITLEMENT_TEST_ADDR", "0xnope");
        assert!(env_wallet_address("ENTITLEMENT_TEST_ADDR").is_err());
        std::env::remove_var("ENTITLEMENT_TEST_ADDR");
    }
}
