// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::pricing::HttpRateSource;
use crate::resolver::EntitlementResolver;
use crate::sources::{ChainIndexerClient, ProcessorClient};
use crate::storage::CustomerDirectory;

/// The resolver as wired in production: HTTP clients for both sources and
/// the rate API. Tests construct the resolver with in-memory sources instead.
pub type ServiceResolver = EntitlementResolver<ChainIndexerClient, ProcessorClient, HttpRateSource>;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ServiceResolver>,
    pub directory: Arc<CustomerDirectory>,
}

impl AppState {
    pub fn new(resolver: ServiceResolver, directory: Arc<CustomerDirectory>) -> Self {
        Self {
            resolver: Arc::new(resolver),
            directory,
        }
    }
}
