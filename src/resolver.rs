// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entitlement Resolver
//!
//! Merges payment evidence from both sources into a deduplicated,
//! time-ordered ledger and derives the wallet's current subscription state.
//!
//! ## Resolution flow
//!
//! 1. Validate the wallet address; no upstream call is made for malformed
//!    input.
//! 2. Fetch from both adapters concurrently, each under its own timeout.
//! 3. One source down: proceed with the other plus the failed source's last
//!    cached events, mark the result `partial`. Both down: fail the call.
//! 4. Merge, dedup on `(source, external_id)`, sort by timestamp.
//! 5. Price each non-refunded event into whole days
//!    (`days = reference_amount / price_per_day`, floored).
//! 6. Accumulate access windows: a payment within the lapse threshold of the
//!    running expiry stacks onto it; a payment after a longer gap starts a
//!    fresh window at its own timestamp.
//!
//! Derivation is a pure function of the event list, a clock value, and the
//! policy, so recomputation is idempotent and safe to run concurrently for
//! the same wallet.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::time::timeout;
use tracing::warn;

use crate::config::EntitlementPolicy;
use crate::ledger::{EntitlementLedger, PaymentEvent, PaymentSource};
use crate::models::{MalformedAddress, WalletAddress};
use crate::pricing::{convert_to_reference, PriceOracle, RateQuote, RateSource};
use crate::sources::{OnChainSource, ProcessorSource, SourceCache};

/// Cap on days granted by a single event, to keep expiry arithmetic inside
/// chrono's representable range.
const MAX_DAYS_PER_EVENT: u64 = 36_500;

const SECONDS_PER_DAY: i64 = 86_400;

/// Resolution failure surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    InvalidAddress(#[from] MalformedAddress),

    /// Both payment sources failed or timed out. Retryable; callers are
    /// expected to apply backoff.
    #[error("both payment sources are unavailable")]
    UpstreamUnavailable,
}

/// Derived subscription state for one wallet. Never stored; always
/// recomputed from current ledger contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub wallet_address: WalletAddress,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_remaining: u64,
    pub total_days_purchased: u64,
    /// Reference-currency minor units across non-refunded events.
    pub total_paid: u64,
    pub payment_count: u64,
    /// One payment source was unavailable; the state degrades to the other
    /// source plus cached evidence.
    pub partial: bool,
    /// On-chain amounts were converted with a fallback rate.
    pub price_stale: bool,
}

/// Outcome of one source fetch, cache fallback included.
enum SourceOutcome {
    /// Upstream (or a fresh cache entry) answered.
    Live(Vec<PaymentEvent>),
    /// Upstream failed; serving the last cached events.
    Cached(Vec<PaymentEvent>),
    /// Upstream failed and no cached events exist.
    Failed,
}

impl SourceOutcome {
    /// Whether the upstream adapter itself failed for this call.
    fn upstream_failed(&self) -> bool {
        matches!(self, SourceOutcome::Cached(_) | SourceOutcome::Failed)
    }

    fn into_events(self) -> Vec<PaymentEvent> {
        match self {
            SourceOutcome::Live(events) | SourceOutcome::Cached(events) => events,
            SourceOutcome::Failed => Vec::new(),
        }
    }
}

/// The entitlement resolution engine.
///
/// Generic over the two source adapters and the rate source so tests can
/// substitute deterministic in-memory implementations.
pub struct EntitlementResolver<O, P, R> {
    onchain: O,
    processor: P,
    oracle: PriceOracle<R>,
    cache: SourceCache,
    policy: EntitlementPolicy,
    source_timeout: StdDuration,
}

impl<O, P, R> EntitlementResolver<O, P, R>
where
    O: OnChainSource,
    P: ProcessorSource,
    R: RateSource,
{
    pub fn new(
        onchain: O,
        processor: P,
        oracle: PriceOracle<R>,
        cache: SourceCache,
        policy: EntitlementPolicy,
        source_timeout: StdDuration,
    ) -> Self {
        Self {
            onchain,
            processor,
            oracle,
            cache,
            policy,
            source_timeout,
        }
    }

    /// Resolve the current subscription state of a wallet.
    pub async fn resolve(&self, raw_address: &str) -> Result<SubscriptionState, ResolveError> {
        let wallet = WalletAddress::parse(raw_address)?;

        let (onchain, processor) = tokio::join!(
            self.fetch_source(PaymentSource::OnChain, &wallet, self.onchain.fetch(&wallet)),
            self.fetch_source(
                PaymentSource::Processor,
                &wallet,
                self.processor.fetch(&wallet)
            ),
        );

        if onchain.upstream_failed() && processor.upstream_failed() {
            return Err(ResolveError::UpstreamUnavailable);
        }
        let partial = onchain.upstream_failed() || processor.upstream_failed();

        let ledger = EntitlementLedger::merge(onchain.into_events(), processor.into_events());

        // Only consult the oracle when an on-chain amount actually needs
        // converting; a pricing outage must not taint card-only wallets.
        let quote = if ledger
            .contributing()
            .any(|e| e.source == PaymentSource::OnChain)
        {
            Some(self.oracle.reference_rate().await)
        } else {
            None
        };

        let priced = price_events(&ledger, quote, &self.policy);
        let mut state = derive_state(wallet, &priced, Utc::now(), &self.policy);
        state.partial = partial;
        state.price_stale = quote.map(|q| q.stale).unwrap_or(false);
        Ok(state)
    }

    /// Run one source fetch under the per-source timeout, with cache
    /// bookkeeping and stale fallback.
    async fn fetch_source<F>(
        &self,
        source: PaymentSource,
        wallet: &WalletAddress,
        fetch: F,
    ) -> SourceOutcome
    where
        F: std::future::Future<Output = Result<Vec<PaymentEvent>, crate::sources::SourceError>>,
    {
        if let Some(events) = self.cache.get(source, wallet) {
            return SourceOutcome::Live(events);
        }

        match timeout(self.source_timeout, fetch).await {
            Ok(Ok(events)) => {
                self.cache.put(source, wallet, events.clone());
                SourceOutcome::Live(events)
            }
            Ok(Err(e)) => {
                warn!(%source, wallet = %wallet, error = %e, "Payment source fetch failed");
                self.stale_or_failed(source, wallet)
            }
            Err(_) => {
                warn!(
                    %source,
                    wallet = %wallet,
                    timeout_ms = self.source_timeout.as_millis() as u64,
                    "Payment source timed out"
                );
                self.stale_or_failed(source, wallet)
            }
        }
    }

    fn stale_or_failed(&self, source: PaymentSource, wallet: &WalletAddress) -> SourceOutcome {
        match self.cache.get_stale(source, wallet) {
            Some(events) => SourceOutcome::Cached(events),
            None => SourceOutcome::Failed,
        }
    }

    /// Drop cached processor events for a wallet so the next resolve
    /// refetches. Called when the wallet's customer association changes.
    pub fn invalidate_processor(&self, wallet: &WalletAddress) {
        self.cache.invalidate(PaymentSource::Processor, wallet);
    }
}

/// A contributing event with its reference-currency value and day grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PricedEvent {
    timestamp: DateTime<Utc>,
    reference_amount: u64,
    days: u64,
}

/// Price the ledger's contributing (non-refunded) events.
///
/// On-chain amounts go through the rate quote; processor amounts are already
/// reference minor units.
fn price_events(
    ledger: &EntitlementLedger,
    quote: Option<RateQuote>,
    policy: &EntitlementPolicy,
) -> Vec<PricedEvent> {
    ledger
        .contributing()
        .map(|event| {
            let reference_amount = match event.source {
                PaymentSource::OnChain => {
                    let rate = quote.map(|q| q.minor_per_token).unwrap_or(0);
                    convert_to_reference(event.amount, rate, policy.token_decimals)
                }
                PaymentSource::Processor => u64::try_from(event.amount).unwrap_or(u64::MAX),
            };
            PricedEvent {
                timestamp: event.timestamp,
                reference_amount,
                days: reference_amount
                    .checked_div(policy.price_per_day_minor)
                    .unwrap_or(0),
            }
        })
        .collect()
}

/// Derive the subscription state from priced events (sorted ascending).
///
/// Pure: same events, clock, and policy always produce the same state.
fn derive_state(
    wallet_address: WalletAddress,
    priced: &[PricedEvent],
    now: DateTime<Utc>,
    policy: &EntitlementPolicy,
) -> SubscriptionState {
    let mut current_expiry: Option<DateTime<Utc>> = None;

    for event in priced {
        let granted = Duration::days(event.days.min(MAX_DAYS_PER_EVENT) as i64);
        current_expiry = Some(match current_expiry {
            // Window still live, or lapsed by no more than the grace period:
            // stack onto the running expiry.
            Some(expiry) if event.timestamp <= expiry + policy.lapse_threshold => expiry + granted,
            // First payment, or lapsed past grace: fresh window from the
            // payment's own time, never reviving the old one.
            _ => event.timestamp + granted,
        });
    }

    let is_active = current_expiry.map(|e| now < e).unwrap_or(false);
    let days_remaining = current_expiry.map(|e| remaining_days(e, now)).unwrap_or(0);

    SubscriptionState {
        wallet_address,
        is_active,
        expires_at: current_expiry,
        days_remaining,
        total_days_purchased: priced.iter().map(|e| e.days).sum(),
        total_paid: priced
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.reference_amount)),
        payment_count: priced.len() as u64,
        partial: false,
        price_stale: false,
    }
}

/// Whole days until expiry, rounded up, never negative.
fn remaining_days(expiry: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let secs = (expiry - now).num_seconds();
    if secs <= 0 {
        0
    } else {
        ((secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY) as u64
    }
}
