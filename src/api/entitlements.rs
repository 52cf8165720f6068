// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entitlement resolution endpoint.

use axum::{extract::State, Json};

use crate::{
    error::ApiError,
    models::{EntitlementResponse, ResolveEntitlementRequest},
    resolver::SubscriptionState,
    state::AppState,
};

impl From<SubscriptionState> for EntitlementResponse {
    fn from(state: SubscriptionState) -> Self {
        EntitlementResponse {
            wallet_address: state.wallet_address.into(),
            is_active: state.is_active,
            expires_at: state.expires_at,
            days_remaining: state.days_remaining,
            total_days_purchased: state.total_days_purchased,
            total_paid: state.total_paid,
            payment_count: state.payment_count,
            partial: state.partial,
            price_stale: state.price_stale,
        }
    }
}

/// Resolve the current entitlement of a wallet.
///
/// Reconciles payment evidence from the blockchain indexer and the card
/// processor and derives the subscription state. The state is computed
/// fresh on every call.
#[utoipa::path(
    post,
    path = "/v1/entitlements/resolve",
    tag = "Entitlements",
    request_body = ResolveEntitlementRequest,
    responses(
        (status = 200, description = "Entitlement resolved", body = EntitlementResponse),
        (status = 400, description = "Malformed wallet address"),
        (status = 503, description = "Both payment sources unavailable"),
        (status = 500, description = "Unexpected internal failure")
    )
)]
pub async fn resolve_entitlement(
    State(state): State<AppState>,
    Json(request): Json<ResolveEntitlementRequest>,
) -> Result<Json<EntitlementResponse>, ApiError> {
    let subscription = state.resolver.resolve(&request.wallet_address).await?;
    Ok(Json(subscription.into()))
}
