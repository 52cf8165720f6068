// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain indexing API adapter.
//!
//! Queries the external indexer for confirmed token transfers directed at the
//! system's receiving address with sender = wallet. The indexer is the only
//! party that sees raw chain data; this adapter trusts its confirmation
//! counts and only normalizes shape:
//!
//! - Transfers below the minimum confirmation count are omitted entirely
//!   (never surfaced as pending) so entitlement is not granted for
//!   transactions that may still revert.
//! - The full history is paginated through; no silent truncation.
//! - Amounts arrive as integer base-unit strings (wei) and are kept as
//!   integer minor units.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{OnChainSource, SourceError};
use crate::ledger::{PaymentEvent, PaymentSource, PaymentStatus};
use crate::models::WalletAddress;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard ceiling on pages walked per fetch. Hitting it means the indexer is
/// returning a pathological history; the fetch fails loudly rather than
/// silently truncating.
const MAX_PAGES: u64 = 10_000;

/// Configuration for the indexing API client.
#[derive(Debug, Clone)]
pub struct ChainIndexerConfig {
    /// Base URL of the indexing API.
    pub base_url: String,
    /// Optional API key sent as `X-Api-Key`.
    pub api_key: Option<String>,
    /// The system's receiving address payments must be directed at.
    pub receiving_address: WalletAddress,
    /// Minimum confirmations before a transfer counts as valid.
    pub min_confirmations: u64,
    /// Transfers requested per page.
    pub page_size: u32,
}

/// Client for the blockchain indexing API.
#[derive(Debug, Clone)]
pub struct ChainIndexerClient {
    config: ChainIndexerConfig,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct TransferPage {
    transfers: Vec<Value>,
    next_page: Option<u64>,
}

/// One transfer row as reported by the indexer.
#[derive(Debug, Deserialize)]
struct IndexedTransfer {
    tx_hash: String,
    /// Integer base-unit amount (wei), as a decimal string.
    value: String,
    confirmations: u64,
    confirmed_at: DateTime<Utc>,
}

impl ChainIndexerClient {
    pub fn new(config: ChainIndexerConfig) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    async fn fetch_page(
        &self,
        wallet: &WalletAddress,
        page: u64,
    ) -> Result<TransferPage, SourceError> {
        let url = format!(
            "{}/v1/transfers",
            self.config.base_url.trim_end_matches('/')
        );

        let mut request = self.http.get(&url).query(&[
            ("recipient", self.config.receiving_address.as_str()),
            ("sender", wallet.as_str()),
            ("page", &page.to_string()),
            ("page_size", &self.config.page_size.to_string()),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Request(format!("GET /v1/transfers failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Request(format!(
                "GET /v1/transfers returned {status}: {body}"
            )));
        }

        response.json().await.map_err(|e| {
            SourceError::InvalidResponse(format!("GET /v1/transfers invalid JSON: {e}"))
        })
    }
}

impl OnChainSource for ChainIndexerClient {
    async fn fetch(&self, wallet: &WalletAddress) -> Result<Vec<PaymentEvent>, SourceError> {
        let mut events = Vec::new();
        let mut page: u64 = 1;
        let mut pages_walked: u64 = 0;

        loop {
            let body = self.fetch_page(wallet, page).await?;

            for row in &body.transfers {
                if let Some(event) =
                    map_transfer(wallet, row, self.config.min_confirmations)
                {
                    events.push(event);
                }
            }

            pages_walked += 1;
            match body.next_page {
                Some(next) if pages_walked < MAX_PAGES => page = next,
                Some(_) => {
                    return Err(SourceError::InvalidResponse(format!(
                        "transfer history exceeded {MAX_PAGES} pages"
                    )));
                }
                None => break,
            }
        }

        Ok(events)
    }
}

/// Map one indexer row to a payment event.
///
/// Returns `None` for transfers below the confirmation threshold, and for
/// malformed rows, which are logged and skipped so one bad record never
/// invalidates the rest of the history.
fn map_transfer(wallet: &WalletAddress, row: &Value, min_confirmations: u64) -> Option<PaymentEvent> {
    let transfer: IndexedTransfer = match serde_json::from_value(row.clone()) {
        Ok(t) => t,
        Err(e) => {
            warn!(wallet = %wallet, error = %e, "Skipping malformed indexer transfer row");
            return None;
        }
    };

    if transfer.confirmations < min_confirmations {
        return None;
    }

    let amount: u128 = match transfer.value.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(
                wallet = %wallet,
                tx_hash = %transfer.tx_hash,
                value = %transfer.value,
                "Skipping transfer with non-integer value"
            );
            return None;
        }
    };

    Some(PaymentEvent {
        source: PaymentSource::OnChain,
        external_id: transfer.tx_hash,
        wallet_address: wallet.clone(),
        amount,
        timestamp: transfer.confirmed_at,
        status: PaymentStatus::Valid,
    })
}
