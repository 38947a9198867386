use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value as JsonValue;

use crate::app::publisher::PublishRequest;
use crate::domain::identity::EvmAddress;
use crate::error::{Error, Result};
use crate::transport::http::types::{
    AppState, ErrorBody, PublishJsonBody, PublishParams, PublishResponse,
};

const DEFAULT_FILENAME: &str = "file.txt";
const DEFAULT_STORAGE_DURATION: u64 = 3;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Publishes caller-supplied content to the storage network, charging the
/// flat fee from the caller's prepaid balance.
///
/// Content arrives either as a JSON body with a `text` field or as a raw
/// request body. Parameters may be given in the query string or (for JSON
/// bodies) alongside `text`; the query string wins when both are present.
#[utoipa::path(
    post,
    path = "/publish",
    params(
        ("identity" = Option<String>, Query, description = "Payer chain-A address"),
        ("filename" = Option<String>, Query, description = "Stored file identifier (defaults to file.txt)"),
        ("storageDuration" = Option<u64>, Query, description = "Storage epochs (defaults to 3)"),
        ("immutable" = Option<bool>, Query, description = "Register blob as non-deletable (defaults to true)")
    ),
    responses(
        (status = 200, description = "Content published and fee charged", body = PublishResponse),
        (status = 402, description = "Prepaid balance below the fee", body = ErrorBody),
        (status = 404, description = "Account not registered", body = ErrorBody),
        (status = 500, description = "Publish flow failed after the fee was charged", body = ErrorBody)
    )
)]
pub async fn publish_handler(
    State(state): State<AppState>,
    Query(query): Query<PublishParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let publisher_address = state.info.publisher_evm_address.to_string();

    match publish_inner(state, query, headers, body).await {
        Ok(resp) => Json(resp).into_response(),
        // Underfunded callers are told where to send the top-up.
        Err(err @ Error::InsufficientFunds { .. }) => {
            let mut body = ErrorBody::from_error(&err);
            if let Some(JsonValue::Object(details)) = body.details.as_mut() {
                details.insert(
                    "publisherEvmAddress".to_string(),
                    JsonValue::String(publisher_address),
                );
            }
            (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn publish_inner(
    state: AppState,
    query: PublishParams,
    headers: HeaderMap,
    body: Bytes,
) -> Result<PublishResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let (contents, content_type, body_params) = if content_type.starts_with("application/json") {
        let parsed: PublishJsonBody = serde_json::from_slice(&body)
            .map_err(|e| Error::MalformedInput(format!("invalid JSON body: {e}")))?;
        (
            parsed.text.into_bytes(),
            "text/plain".to_string(),
            parsed.params,
        )
    } else {
        if body.is_empty() {
            return Err(Error::MalformedInput("empty request body".to_string()));
        }
        (body.to_vec(), content_type, PublishParams::default())
    };

    let identity_raw = query
        .identity
        .or(body_params.identity)
        .ok_or_else(|| Error::MalformedInput("missing identity".to_string()))?;
    let identity = EvmAddress::parse(&identity_raw)?;

    let filename = query
        .filename
        .or(body_params.filename)
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let epochs = query
        .storage_duration
        .or(body_params.storage_duration)
        .unwrap_or(DEFAULT_STORAGE_DURATION);
    let immutable = query
        .immutable
        .or(body_params.immutable)
        .unwrap_or(true);

    let receipt = state
        .publisher
        .publish(PublishRequest {
            identity,
            filename,
            content_type,
            bytes: contents,
            epochs,
            immutable,
        })
        .await?;

    Ok(PublishResponse {
        success: true,
        content_id: receipt.blob_id,
        files: receipt.files,
        fee_charged_wei: receipt.fee_charged.to_string(),
        remaining_balance_wei: receipt.remaining_balance.to_string(),
    })
}
