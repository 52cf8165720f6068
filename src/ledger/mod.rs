// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payment Ledger
//!
//! Payment evidence types and the merged per-wallet ledger. A
//! [`PaymentEvent`] is one observed payment from either source; the
//! [`EntitlementLedger`] is the deduplicated, time-ordered merge of both
//! sources for a single wallet. State derivation lives in [`crate::resolver`].

mod event;
mod merged;

pub use event::{PaymentEvent, PaymentSource, PaymentStatus};
pub use merged::EntitlementLedger;
