// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        CustomerLinkResponse, EntitlementResponse, LinkCustomerRequest, ResolveEntitlementRequest,
        WalletAddress,
    },
    state::AppState,
};

pub mod customers;
pub mod entitlements;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/entitlements/resolve",
            post(entitlements::resolve_entitlement),
        )
        .route(
            "/customers/{wallet_address}",
            put(customers::link_customer).delete(customers::unlink_customer),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        entitlements::resolve_entitlement,
        customers::link_customer,
        customers::unlink_customer,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WalletAddress,
            ResolveEntitlementRequest,
            EntitlementResponse,
            LinkCustomerRequest,
            CustomerLinkResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Entitlements", description = "Entitlement resolution"),
        (name = "Customers", description = "Wallet to processor customer associations"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::EntitlementPolicy;
    use crate::models::WalletAddress;
    use crate::pricing::{HttpRateSource, PriceOracle, RateSourceConfig};
    use crate::resolver::EntitlementResolver;
    use crate::sources::{
        ChainIndexerClient, ChainIndexerConfig, ProcessorClient, ProcessorConfig, SourceCache,
    };
    use crate::storage::CustomerDirectory;

    fn test_state(dir: &std::path::Path) -> AppState {
        let directory =
            Arc::new(CustomerDirectory::open(&dir.join("directory.redb")).unwrap());

        let indexer = ChainIndexerClient::new(ChainIndexerConfig {
            base_url: "http://localhost:9000".to_string(),
            api_key: None,
            receiving_address: WalletAddress::parse(
                "0x1111111111111111111111111111111111111111",
            )
            .unwrap(),
            min_confirmations: 12,
            page_size: 100,
        })
        .unwrap();

        let processor = ProcessorClient::new(
            ProcessorConfig {
                base_url: "http://localhost:9001".to_string(),
                api_key: None,
            },
            directory.clone(),
        )
        .unwrap();

        let rate = HttpRateSource::new(RateSourceConfig {
            base_url: "http://localhost:9002".to_string(),
            base_asset: "AVAX".to_string(),
            quote_currency: "EUR".to_string(),
            quote_exponent: 2,
        })
        .unwrap();

        let resolver = EntitlementResolver::new(
            indexer,
            processor,
            PriceOracle::new(rate, 2000),
            SourceCache::new(16, Duration::from_secs(60)),
            EntitlementPolicy::default(),
            Duration::from_secs(5),
        );

        AppState::new(resolver, directory)
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_state(tmp.path()));
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
