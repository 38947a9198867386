use crate::transport::http::handlers::{account, health, publish, topup};
use crate::transport::http::types::{
    AccountResponse, ErrorBody, HealthResponse, PublishJsonBody, PublishParams, PublishResponse,
    RegisterRequest, TopUpRequest, TopUpResponse,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        account::register_handler,
        account::balance_handler,
        topup::topup_confirm_handler,
        publish::publish_handler
    ),
    components(schemas(
        RegisterRequest,
        AccountResponse,
        TopUpRequest,
        TopUpResponse,
        PublishParams,
        PublishJsonBody,
        PublishResponse,
        HealthResponse,
        ErrorBody,
        crate::app::clients::StoredFile
    ))
)]
#[allow(dead_code)]
pub struct ApiDoc;

pub fn create_router(app_state: crate::transport::http::types::AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/evm/register", post(account::register_handler))
        .route("/evm/topup/confirm", post(topup::topup_confirm_handler))
        .route("/evm/balance", get(account::balance_handler))
        .route("/publish", post(publish::publish_handler))
        .with_state(app_state)
}
