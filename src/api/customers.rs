// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet-to-customer association management.
//!
//! The resolver only reads this association; creating it happens out of
//! band (checkout flow, support tooling) through these endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    models::{CustomerLinkResponse, LinkCustomerRequest, WalletAddress},
    state::AppState,
};

/// Associate a wallet with a payment processor customer.
#[utoipa::path(
    put,
    path = "/v1/customers/{wallet_address}",
    tag = "Customers",
    params(
        ("wallet_address" = String, Path, description = "Wallet address (0x + 40 hex)")
    ),
    request_body = LinkCustomerRequest,
    responses(
        (status = 200, description = "Association stored", body = CustomerLinkResponse),
        (status = 400, description = "Malformed wallet address or customer id"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn link_customer(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
    Json(request): Json<LinkCustomerRequest>,
) -> Result<Json<CustomerLinkResponse>, ApiError> {
    let wallet =
        WalletAddress::parse(&wallet_address).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let customer_id = request.customer_id.trim();
    if customer_id.is_empty() {
        return Err(ApiError::bad_request("customer id must not be empty"));
    }

    state
        .directory
        .link(&wallet, customer_id)
        .map_err(|e| ApiError::internal(format!("failed to store association: {e}")))?;

    // The cached processor history belongs to the previous association.
    state.resolver.invalidate_processor(&wallet);

    Ok(Json(CustomerLinkResponse {
        wallet_address: wallet.into(),
        customer_id: customer_id.to_string(),
    }))
}

/// Remove a wallet's customer association.
#[utoipa::path(
    delete,
    path = "/v1/customers/{wallet_address}",
    tag = "Customers",
    params(
        ("wallet_address" = String, Path, description = "Wallet address (0x + 40 hex)")
    ),
    responses(
        (status = 204, description = "Association removed"),
        (status = 400, description = "Malformed wallet address"),
        (status = 404, description = "No association for this wallet"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn unlink_customer(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<StatusCode, ApiError> {
    let wallet =
        WalletAddress::parse(&wallet_address).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let existed = state
        .directory
        .unlink(&wallet)
        .map_err(|e| ApiError::internal(format!("failed to remove association: {e}")))?;

    state.resolver.invalidate_processor(&wallet);

    if existed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("no association for this wallet"))
    }
}
