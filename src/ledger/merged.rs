// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Merged per-wallet payment ledger.

use std::collections::HashSet;

use super::event::{PaymentEvent, PaymentSource};

/// Deduplicated, ascending-by-timestamp merge of both sources' events for
/// one wallet.
///
/// The ledger is append-only from the caller's perspective: it is rebuilt on
/// every resolve from the adapters' current view, which may only add events
/// or flip processor events to `Refunded`. Refunded events are retained for
/// auditability; callers that derive entitlement iterate
/// [`EntitlementLedger::contributing`] instead.
#[derive(Debug, Clone, Default)]
pub struct EntitlementLedger {
    events: Vec<PaymentEvent>,
}

impl EntitlementLedger {
    /// Merge both adapters' event lists.
    ///
    /// Any entry whose `(source, external_id)` pair was already seen is
    /// dropped (first occurrence wins), then the survivors are sorted
    /// ascending by timestamp. Ties sort by external id so the order is
    /// deterministic.
    pub fn merge(onchain: Vec<PaymentEvent>, processor: Vec<PaymentEvent>) -> Self {
        let mut seen: HashSet<(PaymentSource, String)> = HashSet::new();
        let mut events: Vec<PaymentEvent> = Vec::with_capacity(onchain.len() + processor.len());

        for event in onchain.into_iter().chain(processor) {
            if seen.insert((event.source, event.external_id.clone())) {
                events.push(event);
            }
        }

        events.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });

        Self { events }
    }

    /// All retained events, refunded ones included.
    pub fn events(&self) -> &[PaymentEvent] {
        &self.events
    }

    /// Events that still contribute days and amount (non-refunded).
    pub fn contributing(&self) -> impl Iterator<Item = &PaymentEvent> {
        self.events.iter().filter(|e| e.contributes())
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::ledger::PaymentStatus;
    use crate::models::WalletAddress;

    fn event(source: PaymentSource, id: &str, ts_secs: i64) -> PaymentEvent {
        PaymentEvent {
            source,
            external_id: id.to_string(),
            wallet_address: WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f4ab12")
                .unwrap(),
            amount: 100,
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            status: PaymentStatus::Valid,
        }
    }

    #[test]
    fn merge_sorts_ascending_by_timestamp() {
        let ledger = EntitlementLedger::merge(
            vec![event(PaymentSource::OnChain, "0xbbb", 200)],
            vec![
                event(PaymentSource::Processor, "ch_2", 300),
                event(PaymentSource::Processor, "ch_1", 100),
            ],
        );
        let ids: Vec<&str> = ledger
            .events()
            .iter()
            .map(|e| e.external_id.as_str())
            .collect();
        assert_eq!(ids, vec!["ch_1", "0xbbb", "ch_2"]);
    }

    #[test]
    fn merge_drops_duplicate_source_and_id_pairs() {
        let ledger = EntitlementLedger::merge(
            vec![
                event(PaymentSource::OnChain, "0xaaa", 100),
                event(PaymentSource::OnChain, "0xaaa", 100),
            ],
            vec![],
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn merge_keeps_same_id_from_different_sources() {
        // Sources are disjoint by construction; identical ids across sources
        // are distinct payments.
        let ledger = EntitlementLedger::merge(
            vec![event(PaymentSource::OnChain, "shared", 100)],
            vec![event(PaymentSource::Processor, "shared", 200)],
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn contributing_excludes_refunded() {
        let mut refunded = event(PaymentSource::Processor, "ch_1", 100);
        refunded.status = PaymentStatus::Refunded;
        let ledger =
            EntitlementLedger::merge(vec![event(PaymentSource::OnChain, "0xaaa", 50)], vec![refunded]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.contributing().count(), 1);
    }

    #[test]
    fn empty_merge_is_empty() {
        let ledger = EntitlementLedger::merge(vec![], vec![]);
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }
}
