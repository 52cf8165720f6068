// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card payment processor adapter.
//!
//! Resolves the wallet to a processor customer through the stored
//! wallet-to-customer directory, then fetches that customer's charges. Only
//! charges that reached a succeeded state are returned; charges later marked
//! refunded come back with `Refunded` status rather than being omitted, so
//! the resolver can exclude their contribution while keeping ledger history
//! for audit. A wallet with no directory entry simply has no processor
//! payments.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{ProcessorSource, SourceError};
use crate::ledger::{PaymentEvent, PaymentSource, PaymentStatus};
use crate::models::WalletAddress;
use crate::storage::CustomerDirectory;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the processor API client.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Base URL of the processor API.
    pub base_url: String,
    /// Optional API key sent as `X-Api-Key`.
    pub api_key: Option<String>,
}

/// Client for the card payment processor API.
#[derive(Clone)]
pub struct ProcessorClient {
    config: ProcessorConfig,
    directory: Arc<CustomerDirectory>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ChargeList {
    charges: Vec<Value>,
}

/// One charge row as reported by the processor.
#[derive(Debug, Deserialize)]
struct Charge {
    id: String,
    /// Amount in the reference currency's minor unit.
    amount_minor: u64,
    status: String,
    created_at: DateTime<Utc>,
}

impl ProcessorClient {
    pub fn new(
        config: ProcessorConfig,
        directory: Arc<CustomerDirectory>,
    ) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            directory,
            http,
        })
    }

    async fn fetch_charges(&self, customer_id: &str) -> Result<ChargeList, SourceError> {
        let url = format!(
            "{}/v1/customers/{customer_id}/charges",
            self.config.base_url.trim_end_matches('/')
        );

        let mut request = self.http.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Request(format!("GET charges failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Request(format!(
                "GET charges returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(format!("GET charges invalid JSON: {e}")))
    }
}

impl ProcessorSource for ProcessorClient {
    async fn fetch(&self, wallet: &WalletAddress) -> Result<Vec<PaymentEvent>, SourceError> {
        let Some(customer_id) = self.directory.get(wallet)? else {
            // No association means no card payments for this wallet.
            return Ok(Vec::new());
        };

        let body = self.fetch_charges(&customer_id).await?;

        Ok(body
            .charges
            .iter()
            .filter_map(|row| map_charge(wallet, row))
            .collect())
    }
}

/// Map a raw processor charge status to an event status.
///
/// Returns `None` for statuses that never contribute evidence
/// (pending, failed, disputed, ...).
pub fn map_charge_status(raw_status: &str) -> Option<PaymentStatus> {
    let status = raw_status.trim().to_ascii_lowercase();
    match status.as_str() {
        "succeeded" | "paid" => Some(PaymentStatus::Valid),
        "refunded" | "partially_refunded" => Some(PaymentStatus::Refunded),
        _ => None,
    }
}

/// Map one processor row to a payment event.
///
/// Malformed rows are logged and skipped; one bad record never invalidates
/// the rest of the charge history.
fn map_charge(wallet: &WalletAddress, row: &Value) -> Option<PaymentEvent> {
    let charge: Charge = match serde_json::from_value(row.clone()) {
        Ok(c) => c,
        Err(e) => {
            warn!(wallet = %wallet, error = %e, "Skipping malformed processor charge row");
            return None;
        }
    };

    let status = map_charge_status(&charge.status)?;

    Some(PaymentEvent {
        source: PaymentSource::Processor,
        external_id: charge.id,
        wallet_address: wallet.clone(),
        amount: u128::from(charge.amount_minor),
        timestamp: charge.created_at,
        status,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn wallet() -> WalletAddress {
        WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f4ab12").unwrap()
    }

    #[test]
    fn charge_status_mapping_is_stable() {
        assert_eq!(map_charge_status("succeeded"), Some(PaymentStatus::Valid));
        assert_eq!(map_charge_status("REFUNDED"), Some(PaymentStatus::Refunded));
        assert_eq!(map_charge_status("pending"), None);
        assert_eq!(map_charge_status("failed"), None);
    }

    #[test]
    fn map_charge_returns_refunded_rather_than_omitting() {
        let row = json!({
            "id": "ch_refund",
            "amount_minor": 900,
            "status": "refunded",
            "created_at": "2026-02-01T09:00:00Z"
        });
        let event = map_charge(&wallet(), &row).unwrap();
        assert_eq!(event.status, PaymentStatus::Refunded);
        assert_eq!(event.amount, 900);
    }

    #[test]
    fn map_charge_omits_pending() {
        let row = json!({
            "id": "ch_pending",
            "amount_minor": 900,
            "status": "pending",
            "created_at": "2026-02-01T09:00:00Z"
        });
        assert!(map_charge(&wallet(), &row).is_none());
    }

    #[test]
    fn map_charge_skips_malformed_row() {
        let row = json!({ "id": "ch_bad", "amount_minor": "nine hundred" });
        assert!(map_charge(&wallet(), &row).is_none());
    }
}
