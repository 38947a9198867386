use axum::extract::State;
use axum::Json;

use crate::transport::http::types::{AppState, HealthResponse};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service identity addresses and configured fee", body = HealthResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    // The chain-id probe is diagnostic only; the service stays healthy even
    // when the chain-A node is momentarily unreachable.
    let evm_chain_id = state.evm.chain_id().await.ok();

    Json(HealthResponse {
        success: true,
        network: state.info.network.clone(),
        publisher_evm_address: state.info.publisher_evm_address.to_string(),
        storage_owner: state.info.storage_owner.clone(),
        store_fee_wei: state.info.store_fee_wei.to_string(),
        evm_chain_id,
    })
}
