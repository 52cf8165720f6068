// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Price Oracle
//!
//! Converts on-chain payment amounts (native token minor units) into the
//! reference currency used for day-pricing. The spot rate comes from an
//! external price-reference API; when that API is unavailable the oracle
//! falls back to the last successfully fetched rate, then to the configured
//! default, and signals staleness instead of failing. Oracle trouble never
//! propagates into the resolver's critical path.
//!
//! All conversion is integer math: rates are held as reference minor units
//! per whole token, and division floors.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Error from the price-reference API.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Request(String),

    #[error("rate response was invalid: {0}")]
    InvalidResponse(String),
}

/// Source of the token/fiat spot rate.
pub trait RateSource {
    /// Current spot rate as reference minor units per whole token.
    fn spot_rate(&self) -> impl Future<Output = Result<u64, RateError>> + Send;
}

/// A resolved rate plus whether it came from a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuote {
    /// Reference minor units per whole token.
    pub minor_per_token: u64,
    /// True when the live rate was unavailable.
    pub stale: bool,
}

// =============================================================================
// HTTP Rate Source
// =============================================================================

/// Configuration for the price-reference API client.
#[derive(Debug, Clone)]
pub struct RateSourceConfig {
    /// Base URL of the price-reference API.
    pub base_url: String,
    /// Token symbol to quote (e.g. `AVAX`).
    pub base_asset: String,
    /// Reference currency code (e.g. `EUR`).
    pub quote_currency: String,
    /// Decimal places of the reference currency's minor unit.
    pub quote_exponent: u32,
}

/// Client for the token/fiat spot-rate API.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    config: RateSourceConfig,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct SpotResponse {
    /// Decimal rate string, e.g. `"25.34"`.
    rate: String,
}

impl HttpRateSource {
    pub fn new(config: RateSourceConfig) -> Result<Self, RateError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| RateError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }
}

impl RateSource for HttpRateSource {
    async fn spot_rate(&self) -> Result<u64, RateError> {
        let url = format!("{}/v1/spot", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[
                ("base", self.config.base_asset.as_str()),
                ("quote", self.config.quote_currency.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RateError::Request(format!("GET /v1/spot failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RateError::Request(format!(
                "GET /v1/spot returned {status}: {body}"
            )));
        }

        let body: SpotResponse = response
            .json()
            .await
            .map_err(|e| RateError::InvalidResponse(format!("GET /v1/spot invalid JSON: {e}")))?;

        decimal_to_minor(&body.rate, self.config.quote_exponent).ok_or_else(|| {
            RateError::InvalidResponse(format!("unparseable rate value: {}", body.rate))
        })
    }
}

// =============================================================================
// Price Oracle
// =============================================================================

/// Spot-rate provider with fallback semantics.
pub struct PriceOracle<R> {
    source: R,
    fallback_minor_per_token: u64,
    last_known: Mutex<Option<u64>>,
}

impl<R: RateSource> PriceOracle<R> {
    pub fn new(source: R, fallback_minor_per_token: u64) -> Self {
        Self {
            source,
            fallback_minor_per_token,
            last_known: Mutex::new(None),
        }
    }

    /// Fetch the current reference rate.
    ///
    /// On source failure, returns the last successfully fetched rate, or the
    /// configured fallback, marked `stale`.
    pub async fn reference_rate(&self) -> RateQuote {
        match self.source.spot_rate().await {
            Ok(rate) => {
                if let Ok(mut last) = self.last_known.lock() {
                    *last = Some(rate);
                }
                RateQuote {
                    minor_per_token: rate,
                    stale: false,
                }
            }
            Err(e) => {
                let last = self.last_known.lock().ok().and_then(|guard| *guard);
                let rate = last.unwrap_or(self.fallback_minor_per_token);
                warn!(
                    error = %e,
                    fallback_rate = rate,
                    "Price reference unavailable, using fallback rate"
                );
                RateQuote {
                    minor_per_token: rate,
                    stale: true,
                }
            }
        }
    }
}

/// Convert a native minor-unit amount to reference minor units.
///
/// `reference = amount * minor_per_token / 10^token_decimals`, floored.
/// Saturates at `u64::MAX` rather than wrapping on absurd inputs.
pub fn convert_to_reference(amount: u128, minor_per_token: u64, token_decimals: u32) -> u64 {
    let scale = 10u128.checked_pow(token_decimals).unwrap_or(u128::MAX);
    let reference = amount
        .saturating_mul(u128::from(minor_per_token))
        / scale;
    u64::try_from(reference).unwrap_or(u64::MAX)
}

/// Parse a decimal string into minor units with the given exponent.
///
/// `"25.34"` with exponent 2 becomes `2534`. Excess fractional digits are
/// floored away. Returns `None` on malformed input or overflow.
fn decimal_to_minor(raw: &str, exponent: u32) -> Option<u64> {
    let raw = raw.trim();
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().ok()?
    };

    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut frac_digits: String = frac.chars().take(exponent as usize).collect();
    while frac_digits.len() < exponent as usize {
        frac_digits.push('0');
    }
    let frac_minor: u64 = if frac_digits.is_empty() {
        0
    } else {
        frac_digits.parse().ok()?
    };

    let scale = 10u64.checked_pow(exponent)?;
    whole.checked_mul(scale)?.checked_add(frac_minor)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn decimal_to_minor_parses_typical_rates() {
        assert_eq!(decimal_to_minor("25.34", 2), Some(2534));
        assert_eq!(decimal_to_minor("25", 2), Some(2500));
        assert_eq!(decimal_to_minor("0.5", 2), Some(50));
        assert_eq!(decimal_to_minor(".5", 2), Some(50));
        assert_eq!(decimal_to_minor("25.349", 2), Some(2534));
    }

    #[test]
    fn decimal_to_minor_rejects_garbage() {
        assert_eq!(decimal_to_minor("", 2), None);
        assert_eq!(decimal_to_minor(".", 2), None);
        assert_eq!(decimal_to_minor("25.3x", 2), None);
        assert_eq!(decimal_to_minor("-3", 2), None);
    }

    #[test]
    fn convert_scales_by_token_decimals() {
        // 1 token at 25.34 per token.
        assert_eq!(
            convert_to_reference(1_000_000_000_000_000_000, 2534, 18),
            2534
        );
        // 0.5 token.
        assert_eq!(convert_to_reference(500_000_000_000_000_000, 2534, 18), 1267);
        assert_eq!(convert_to_reference(0, 2534, 18), 0);
    }

    struct FlakyRate {
        fail: AtomicBool,
        rate: u64,
    }

    impl RateSource for FlakyRate {
        async fn spot_rate(&self) -> Result<u64, RateError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(RateError::Request("down".to_string()))
            } else {
                Ok(self.rate)
            }
        }
    }

    #[tokio::test]
    async fn oracle_returns_live_rate() {
        let oracle = PriceOracle::new(
            FlakyRate {
                fail: AtomicBool::new(false),
                rate: 2534,
            },
            1000,
        );
        let quote = oracle.reference_rate().await;
        assert_eq!(quote.minor_per_token, 2534);
        assert!(!quote.stale);
    }

    #[tokio::test]
    async fn oracle_falls_back_to_configured_rate() {
        let oracle = PriceOracle::new(
            FlakyRate {
                fail: AtomicBool::new(true),
                rate: 2534,
            },
            1000,
        );
        let quote = oracle.reference_rate().await;
        assert_eq!(quote.minor_per_token, 1000);
        assert!(quote.stale);
    }

    #[tokio::test]
    async fn oracle_prefers_last_known_over_configured() {
        let source = FlakyRate {
            fail: AtomicBool::new(false),
            rate: 2534,
        };
        let oracle = PriceOracle::new(source, 1000);

        let live = oracle.reference_rate().await;
        assert!(!live.stale);

        oracle.source.fail.store(true, Ordering::SeqCst);
        let stale = oracle.reference_rate().await;
        assert!(stale.stale);
        assert_eq!(stale.minor_per_token, 2534);
    }
}
