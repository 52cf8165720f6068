// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payment Sources
//!
//! Adapters over the two independent payment evidence sources:
//!
//! - [`ChainIndexerClient`] queries the blockchain indexing API for confirmed
//!   token transfers to the receiving address.
//! - [`ProcessorClient`] queries the card payment processor for a customer's
//!   succeeded charges, resolving the wallet through the stored
//!   wallet-to-customer directory.
//!
//! Both implement a narrow trait seam so the resolver can be exercised with
//! deterministic in-memory sources in tests. The [`SourceCache`] bounds
//! duplicate upstream calls and backs the partial-failure fallback.

mod cache;
mod onchain;
mod processor;

use std::future::Future;

pub use cache::SourceCache;
pub use onchain::{ChainIndexerClient, ChainIndexerConfig};
pub use processor::{map_charge_status, ProcessorClient, ProcessorConfig};

use crate::ledger::PaymentEvent;
use crate::models::WalletAddress;
use crate::storage::DirectoryError;

/// Error from a payment source adapter.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("upstream request failed: {0}")]
    Request(String),

    #[error("upstream response was invalid: {0}")]
    InvalidResponse(String),

    #[error("customer directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// On-chain payment evidence source.
pub trait OnChainSource {
    /// Fetch all confirmed payments sent by `wallet` to the receiving
    /// address, as normalized events.
    fn fetch(
        &self,
        wallet: &WalletAddress,
    ) -> impl Future<Output = Result<Vec<PaymentEvent>, SourceError>> + Send;
}

/// Off-chain (card processor) payment evidence source.
pub trait ProcessorSource {
    /// Fetch all succeeded charges for the customer linked to `wallet`.
    /// Refunded charges are returned with `Refunded` status, not omitted.
    fn fetch(
        &self,
        wallet: &WalletAddress,
    ) -> impl Future<Output = Result<Vec<PaymentEvent>, SourceError>> + Send;
}
