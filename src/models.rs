// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response data structures used by the REST API, plus the
//! [`WalletAddress`] newtype shared by every subsystem. All wire types derive
//! `Serialize`/`Deserialize` and `ToSchema` for automatic JSON handling and
//! OpenAPI documentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Wallet Address Type
// =============================================================================

/// Ethereum-compatible wallet address, validated and normalized to lowercase.
///
/// Format: `0x` followed by 40 hexadecimal characters (20 bytes). Construction
/// goes through [`WalletAddress::parse`], so a held value is always well-formed
/// and safe to use as a cache or directory key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress(String);

/// Error returned when an address does not match `0x` + 40 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed wallet address: expected 0x-prefixed 40-character hex string")]
pub struct MalformedAddress;

impl WalletAddress {
    /// Parse and normalize a wallet address.
    ///
    /// Accepts mixed-case input and stores the lowercase form.
    pub fn parse(raw: &str) -> Result<Self, MalformedAddress> {
        let trimmed = raw.trim();
        let hex = trimmed.strip_prefix("0x").ok_or(MalformedAddress)?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MalformedAddress);
        }
        Ok(WalletAddress(trimmed.to_ascii_lowercase()))
    }

    /// The normalized lowercase `0x…` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

// =============================================================================
// Entitlement Models
// =============================================================================

/// Request to resolve the current entitlement of a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveEntitlementRequest {
    /// The wallet address to resolve (`0x` + 40 hex characters).
    pub wallet_address: String,
}

/// Derived subscription state for a wallet.
///
/// Recomputed fresh from payment evidence on every resolve call; never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    /// The normalized wallet address the state was derived for.
    pub wallet_address: String,
    /// Whether the wallet currently has paid access.
    pub is_active: bool,
    /// Instant the current access window ends, if any payment was ever made.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whole days of access remaining (ceiling, never negative).
    pub days_remaining: u64,
    /// Total days ever purchased across non-refunded payments.
    pub total_days_purchased: u64,
    /// Total paid in reference-currency minor units, non-refunded payments only.
    pub total_paid: u64,
    /// Number of non-refunded payments observed.
    pub payment_count: u64,
    /// True when one payment source was unavailable and the result degrades
    /// to the other source plus cached evidence.
    pub partial: bool,
    /// True when the price reference was unavailable and a fallback rate was
    /// used to convert on-chain amounts.
    pub price_stale: bool,
}

// =============================================================================
// Customer Association Models
// =============================================================================

/// Request to associate a wallet with a payment processor customer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkCustomerRequest {
    /// The processor-side customer identifier (e.g. `cus_...`).
    pub customer_id: String,
}

/// Response describing a wallet to customer association.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLinkResponse {
    /// The normalized wallet address.
    pub wallet_address: String,
    /// The linked processor customer id.
    pub customer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_valid_address_and_lowercases() {
        let addr = WalletAddress::parse("0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12").unwrap();
        assert_eq!(addr.as_str(), "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let addr = WalletAddress::parse("  0x742d35cc6634c0532925a3b844bc9e7595f4ab12  ").unwrap();
        assert_eq!(addr.as_str(), "0x742d35cc6634c0532925a3b844bc9e7595f4ab12");
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        assert!(WalletAddress::parse("742d35cc6634c0532925a3b844bc9e7595f4ab12").is_err());
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(WalletAddress::parse("0x742d35cc").is_err());
        assert!(WalletAddress::parse("0x742d35cc6634c0532925a3b844bc9e7595f4ab12ff").is_err());
    }

    #[test]
    fn parse_rejects_non_hex_characters() {
        assert!(WalletAddress::parse("0xZZZd35cc6634c0532925a3b844bc9e7595f4ab12").is_err());
    }

    #[test]
    fn resolve_request_uses_camel_case() {
        let req: ResolveEntitlementRequest = serde_json::from_str(
            r#"{"walletAddress":"0x742d35cc6634c0532925a3b844bc9e7595f4ab12"}"#,
        )
        .unwrap();
        assert!(req.wallet_address.starts_with("0x"));
    }

    #[test]
    fn entitlement_response_serializes_camel_case() {
        let response = EntitlementResponse {
            wallet_address: "0x742d35cc6634c0532925a3b844bc9e7595f4ab12".to_string(),
            is_active: false,
            expires_at: None,
            days_remaining: 0,
            total_days_purchased: 0,
            total_paid: 0,
            payment_count: 0,
            partial: false,
            price_stale: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"isActive\":false"));
        assert!(json.contains("\"expiresAt\":null"));
        assert!(json.contains("\"daysRemaining\":0"));
    }
}
