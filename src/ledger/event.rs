// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payment event types shared by both source adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::WalletAddress;

/// Which independent system observed a payment.
///
/// Closed set: every merge and derivation step matches exhaustively, so
/// adding a third source is a compile-time-checked change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    /// Confirmed token transfer reported by the blockchain indexing API.
    OnChain,
    /// Succeeded charge reported by the card payment processor.
    Processor,
}

impl std::fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentSource::OnChain => write!(f, "on_chain"),
            PaymentSource::Processor => write!(f, "processor"),
        }
    }
}

/// Lifecycle status of a payment event.
///
/// Processor events may transition `Valid` → `Refunded`; on-chain events are
/// always `Valid` once confirmed (there is no on-chain refund concept here).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Valid,
    Refunded,
}

/// One observed payment.
///
/// Immutable except for the `Valid` → `Refunded` transition, which the
/// processor adapter reports on subsequent fetches. Events are never removed
/// from the ledger; refunded events stay for auditability but contribute
/// nothing to day or amount totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentEvent {
    /// The system that observed the payment.
    pub source: PaymentSource,
    /// Unique id within `source`: transaction hash or charge id.
    pub external_id: String,
    /// The paying wallet, normalized lowercase.
    pub wallet_address: WalletAddress,
    /// Amount in the event's native minor unit (wei for on-chain, currency
    /// minor unit for processor charges).
    pub amount: u128,
    /// Instant the payment became valid: confirmation time on-chain,
    /// charge-succeeded time at the processor.
    pub timestamp: DateTime<Utc>,
    /// Current status of the payment.
    pub status: PaymentStatus,
}

impl PaymentEvent {
    /// The deduplication key: `(source, external_id)` is unique across the
    /// whole merged ledger for a wallet.
    pub fn dedup_key(&self) -> (PaymentSource, &str) {
        (self.source, self.external_id.as_str())
    }

    /// Whether this event still contributes days and amount.
    pub fn contributes(&self) -> bool {
        self.status == PaymentStatus::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(source: PaymentSource, id: &str, status: PaymentStatus) -> PaymentEvent {
        PaymentEvent {
            source,
            external_id: id.to_string(),
            wallet_address: WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f4ab12")
                .unwrap(),
            amount: 100,
            timestamp: Utc::now(),
            status,
        }
    }

    #[test]
    fn dedup_key_distinguishes_sources() {
        let a = event(PaymentSource::OnChain, "id-1", PaymentStatus::Valid);
        let b = event(PaymentSource::Processor, "id-1", PaymentStatus::Valid);
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn refunded_event_does_not_contribute() {
        let valid = event(PaymentSource::Processor, "ch_1", PaymentStatus::Valid);
        let refunded = event(PaymentSource::Processor, "ch_2", PaymentStatus::Refunded);
        assert!(valid.contributes());
        assert!(!refunded.contributes());
    }

    #[test]
    fn source_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentSource::OnChain).unwrap(),
            "\"on_chain\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentSource::Processor).unwrap(),
            "\"processor\""
        );
    }
}
