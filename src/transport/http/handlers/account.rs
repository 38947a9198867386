use axum::extract::{Query, State};
use axum::Json;

use crate::domain::identity::EvmAddress;
use crate::error::Result;
use crate::transport::http::types::{
    AccountResponse, AppState, BalanceQuery, RegisterRequest,
};

#[utoipa::path(
    post,
    path = "/evm/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account registered (idempotent)", body = AccountResponse),
        (status = 400, description = "Malformed identity", body = crate::transport::http::types::ErrorBody)
    )
)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AccountResponse>> {
    let identity = EvmAddress::parse(&req.identity)?;
    let account = state.ledger.register(&identity).await;

    Ok(Json(AccountResponse {
        success: true,
        identity: account.identity.to_string(),
        balance_wei: account.balance.to_string(),
        publisher_evm_address: state.info.publisher_evm_address.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/evm/balance",
    params(("identity" = String, Query, description = "Payer chain-A address")),
    responses(
        (status = 200, description = "Current prepaid balance", body = AccountResponse),
        (status = 404, description = "Account not registered", body = crate::transport::http::types::ErrorBody)
    )
)]
pub async fn balance_handler(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<AccountResponse>> {
    let identity = EvmAddress::parse(&query.identity)?;
    let balance = state.ledger.balance_of(&identity).await?;

    Ok(Json(AccountResponse {
        success: true,
        identity: identity.to_string(),
        balance_wei: balance.to_string(),
        publisher_evm_address: state.info.publisher_evm_address.to_string(),
    }))
}
