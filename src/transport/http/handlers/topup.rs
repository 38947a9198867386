use axum::extract::State;
use axum::Json;

use crate::domain::identity::{EvmAddress, TxHash};
use crate::error::Result;
use crate::transport::http::types::{AppState, TopUpRequest, TopUpResponse};

const DEFAULT_MIN_CONFIRMATIONS: u64 = 1;

/// Confirms a chain-A top-up transfer and credits the payer's balance.
///
/// Verification is a pure chain read; the ledger is only touched after it
/// succeeds. Replaying the same transaction is answered success-shaped with
/// `alreadyCredited` and an unchanged balance.
#[utoipa::path(
    post,
    path = "/evm/topup/confirm",
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Credited, or already credited", body = TopUpResponse),
        (status = 400, description = "Verification failed", body = crate::transport::http::types::ErrorBody),
        (status = 404, description = "Unknown account or transaction", body = crate::transport::http::types::ErrorBody)
    )
)]
pub async fn topup_confirm_handler(
    State(state): State<AppState>,
    Json(req): Json<TopUpRequest>,
) -> Result<Json<TopUpResponse>> {
    let identity = EvmAddress::parse(&req.identity)?;
    let tx_hash = TxHash::parse(&req.tx_id)?;
    let min_confirmations = req.min_confirmations.unwrap_or(DEFAULT_MIN_CONFIRMATIONS);

    // Cheap registration precondition before any chain call.
    state.ledger.balance_of(&identity).await?;

    let verified = state
        .verifier
        .verify(
            &tx_hash,
            &identity,
            &state.info.publisher_evm_address,
            min_confirmations,
        )
        .await?;

    let outcome = state.ledger.credit(&identity, &tx_hash, verified.value).await?;
    if outcome.already_credited {
        return Ok(Json(TopUpResponse {
            success: true,
            tx_id: tx_hash.to_string(),
            already_credited: true,
            credited_wei: None,
            confirmations: None,
            balance_wei: outcome.account.balance.to_string(),
        }));
    }

    Ok(Json(TopUpResponse {
        success: true,
        tx_id: tx_hash.to_string(),
        already_credited: false,
        credited_wei: Some(verified.value.to_string()),
        confirmations: Some(verified.confirmations),
        balance_wei: outcome.account.balance.to_string(),
    }))
}
