// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use entitlement_server::api::router;
use entitlement_server::config::ServiceConfig;
use entitlement_server::pricing::{HttpRateSource, PriceOracle};
use entitlement_server::resolver::EntitlementResolver;
use entitlement_server::sources::{ChainIndexerClient, ProcessorClient, SourceCache};
use entitlement_server::state::AppState;
use entitlement_server::storage::CustomerDirectory;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServiceConfig::from_env().expect("Invalid configuration");

    let directory = Arc::new(
        CustomerDirectory::open(&config.data_dir.join("customer_directory.redb"))
            .expect("Failed to open customer directory database"),
    );

    let indexer =
        ChainIndexerClient::new(config.indexer.clone()).expect("Failed to build indexer client");
    let processor = ProcessorClient::new(config.processor.clone(), directory.clone())
        .expect("Failed to build processor client");
    let rate_source =
        HttpRateSource::new(config.rate_source.clone()).expect("Failed to build rate client");

    let resolver = EntitlementResolver::new(
        indexer,
        processor,
        PriceOracle::new(rate_source, config.fallback_rate_minor),
        SourceCache::new(config.cache_capacity, config.cache_ttl),
        config.policy,
        config.source_timeout,
    );

    let state = AppState::new(resolver, directory);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    info!(%addr, "Entitlement server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=debug"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
