use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::app::clients::StoredFile;
use crate::app::publisher::PublishService;
use crate::domain::identity::EvmAddress;
use crate::domain::ledger::CreditLedger;
use crate::domain::verify::{EvmChainReader, ReceiptVerifier};
use crate::error::Error;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<CreditLedger>,
    pub verifier: Arc<ReceiptVerifier>,
    pub publisher: Arc<PublishService>,
    pub evm: Arc<dyn EvmChainReader>,
    pub info: ServiceInfo,
}

/// Static service identity reported by /health and echoed in responses.
#[derive(Clone)]
pub struct ServiceInfo {
    /// Custodial chain-A address users send top-ups to.
    pub publisher_evm_address: EvmAddress,
    /// Chain-B address owning registered blobs.
    pub storage_owner: String,
    pub store_fee_wei: U256,
    pub network: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub identity: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub success: bool,
    pub identity: String,
    /// Balance in wei, as a decimal string.
    pub balance_wei: String,
    pub publisher_evm_address: String,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub identity: String,
    pub tx_id: String,
    /// Minimum confirmation depth (defaults to 1).
    #[serde(default)]
    pub min_confirmations: Option<u64>,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpResponse {
    pub success: bool,
    pub tx_id: String,
    /// True when this confirmation was already applied; the balance is
    /// unchanged and `creditedWei`/`confirmations` are omitted.
    pub already_credited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credited_wei: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    pub balance_wei: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct BalanceQuery {
    pub identity: String,
}

/// Publish parameters; each may arrive via query string or JSON body,
/// with the query string taking precedence.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishParams {
    pub identity: Option<String>,
    pub filename: Option<String>,
    /// Storage duration in storage-network epochs (defaults to 3).
    pub storage_duration: Option<u64>,
    /// Whether the blob is registered as non-deletable (defaults to true).
    pub immutable: Option<bool>,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishJsonBody {
    pub text: String,
    #[serde(flatten)]
    pub params: PublishParams,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub content_id: String,
    pub files: Vec<StoredFile>,
    pub fee_charged_wei: String,
    pub remaining_balance_wei: String,
}

#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub network: String,
    pub publisher_evm_address: String,
    pub storage_owner: String,
    pub store_fee_wei: String,
    /// Best-effort chain-A probe; absent when the RPC node is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evm_chain_id: Option<u64>,
}

/// Uniform failure body: a stable kind string, a human message and, where
/// applicable, the comparison values that produced the failure.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<JsonValue>,
}

impl ErrorBody {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            error: err.kind().to_string(),
            message: err.to_string(),
            details: error_details(err),
        }
    }
}

fn error_details(err: &Error) -> Option<JsonValue> {
    match err {
        Error::InsufficientConfirmations { observed, required } => Some(serde_json::json!({
            "confirmations": observed,
            "required": required,
        })),
        Error::InsufficientBalance { balance, required }
        | Error::InsufficientFunds { balance, required } => Some(serde_json::json!({
            "balanceWei": balance.to_string(),
            "requiredWei": required.to_string(),
        })),
        Error::AddressMismatch {
            field,
            expected,
            actual,
        } => Some(serde_json::json!({
            "field": field,
            "expected": expected,
            "actual": actual,
        })),
        Error::PublishFailed { step, .. } | Error::AmbiguousOutcome { step } => {
            Some(serde_json::json!({ "step": step }))
        }
        _ => None,
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::MalformedInput(_)
        | Error::InvalidAmount
        | Error::AddressMismatch { .. }
        | Error::NotMined(_)
        | Error::TransactionFailed(_)
        | Error::InsufficientConfirmations { .. }
        | Error::ZeroValue(_) => StatusCode::BAD_REQUEST,
        Error::UnknownAccount(_) | Error::TxNotFound(_) => StatusCode::NOT_FOUND,
        Error::InsufficientBalance { .. } | Error::InsufficientFunds { .. } => {
            StatusCode::PAYMENT_REQUIRED
        }
        Error::BalanceOverflow
        | Error::PublishFailed { .. }
        | Error::AmbiguousOutcome { .. }
        | Error::RpcTimeout
        | Error::Rpc(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (status_for(&self), Json(ErrorBody::from_error(&self))).into_response()
    }
}
