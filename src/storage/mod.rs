// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage
//!
//! Embedded persistence for the wallet-to-customer association, backed by
//! redb (pure Rust, ACID). Resolution itself stores nothing: subscription
//! state is derived fresh on every call.

mod directory;

pub use directory::{CustomerDirectory, DirectoryError};
