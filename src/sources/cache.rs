// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for per-source payment event lookups.
//!
//! Caches the most recent event list per `(source, wallet)` key. Fresh hits
//! bound duplicate upstream calls when the same wallet is resolved in quick
//! succession; expired entries are kept retrievable via
//! [`SourceCache::get_stale`] so a resolve can degrade gracefully when one
//! source is down. Concurrent refreshes race last-writer-wins, which is
//! acceptable because derivation is a pure function of the event list.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::ledger::{PaymentEvent, PaymentSource};
use crate::models::WalletAddress;

/// Cached entry: event list + insertion timestamp.
struct CacheEntry {
    events: Vec<PaymentEvent>,
    inserted_at: Instant,
}

/// In-process LRU cache for source fetch results.
pub struct SourceCache {
    cache: Mutex<LruCache<(PaymentSource, String), CacheEntry>>,
    ttl: Duration,
}

impl SourceCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of `(source, wallet)` keys to cache.
    /// - `ttl`: Freshness window for [`SourceCache::get`].
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Get a fresh cached event list, or `None` if absent or expired.
    ///
    /// Expired entries are left in place so [`SourceCache::get_stale`] can
    /// still serve them during a source outage.
    pub fn get(&self, source: PaymentSource, wallet: &WalletAddress) -> Option<Vec<PaymentEvent>> {
        let key = (source, wallet.as_str().to_string());
        let mut cache = self.cache.lock().ok()?;
        let entry = cache.get(&key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.events.clone())
        } else {
            None
        }
    }

    /// Get the last known event list regardless of age.
    ///
    /// Used as the fallback when the source itself is unavailable.
    pub fn get_stale(
        &self,
        source: PaymentSource,
        wallet: &WalletAddress,
    ) -> Option<Vec<PaymentEvent>> {
        let key = (source, wallet.as_str().to_string());
        let mut cache = self.cache.lock().ok()?;
        cache.get(&key).map(|entry| entry.events.clone())
    }

    /// Store the latest event list for a `(source, wallet)` key.
    pub fn put(&self, source: PaymentSource, wallet: &WalletAddress, events: Vec<PaymentEvent>) {
        let key = (source, wallet.as_str().to_string());
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    events,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the cached entry for a `(source, wallet)` key.
    pub fn invalidate(&self, source: PaymentSource, wallet: &WalletAddress) {
        let key = (source, wallet.as_str().to_string());
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::ledger::PaymentStatus;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f4ab12").unwrap()
    }

    fn sample_event() -> PaymentEvent {
        PaymentEvent {
            source: PaymentSource::OnChain,
            external_id: "0xabc".to_string(),
            wallet_address: wallet(),
            amount: 1_000_000_000_000_000_000,
            timestamp: Utc::now(),
            status: PaymentStatus::Valid,
        }
    }

    #[test]
    fn cache_put_and_get() {
        let cache = SourceCache::new(10, Duration::from_secs(300));
        let w = wallet();

        assert!(cache.get(PaymentSource::OnChain, &w).is_none());

        cache.put(PaymentSource::OnChain, &w, vec![sample_event()]);

        let result = cache.get(PaymentSource::OnChain, &w).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].external_id, "0xabc");
    }

    #[test]
    fn cache_keys_are_per_source() {
        let cache = SourceCache::new(10, Duration::from_secs(300));
        let w = wallet();
        cache.put(PaymentSource::OnChain, &w, vec![sample_event()]);

        assert!(cache.get(PaymentSource::Processor, &w).is_none());
    }

    #[test]
    fn cache_ttl_expiry_still_serves_stale() {
        let cache = SourceCache::new(10, Duration::from_millis(1));
        let w = wallet();
        cache.put(PaymentSource::OnChain, &w, vec![sample_event()]);

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(PaymentSource::OnChain, &w).is_none());
        assert!(cache.get_stale(PaymentSource::OnChain, &w).is_some());
    }

    #[test]
    fn cache_invalidate_removes_stale_too() {
        let cache = SourceCache::new(10, Duration::from_secs(300));
        let w = wallet();
        cache.put(PaymentSource::OnChain, &w, vec![sample_event()]);

        cache.invalidate(PaymentSource::OnChain, &w);
        assert!(cache.get(PaymentSource::OnChain, &w).is_none());
        assert!(cache.get_stale(PaymentSource::OnChain, &w).is_none());
    }
}
