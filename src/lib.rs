// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entitlement Server - Payment Entitlement Resolution Service
//!
//! This crate resolves paid-access entitlements for wallet addresses by
//! reconciling payment evidence from two independent sources: an on-chain
//! payment ledger (via a blockchain indexing API) and an off-chain card
//! payment processor.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `resolver` - Ledger merge and subscription state derivation
//! - `sources` - On-chain and processor source adapters
//! - `pricing` - Token/fiat price oracle with fallback
//! - `storage` - Wallet-to-customer directory (redb)

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod resolver;
pub mod sources;
pub mod state;
pub mod storage;
