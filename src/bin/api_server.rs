// src/bin/api_server.rs

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crosschain_publisher::app::publisher::PublishService;
use crosschain_publisher::domain::ledger::CreditLedger;
use crosschain_publisher::domain::verify::ReceiptVerifier;
use crosschain_publisher::infra::config;
use crosschain_publisher::infra::evm::{address_from_private_key, EvmRpcClient};
use crosschain_publisher::infra::sui::SuiClient;
use crosschain_publisher::infra::walrus::WalrusClient;
use crosschain_publisher::transport;

const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let timeout = config::rpc_timeout();

    // --- Chain clients ---
    let evm = Arc::new(EvmRpcClient::new(config::evm_rpc_url(), timeout)?);
    let publisher_evm_address = address_from_private_key(&config::evm_private_key())?;
    let sui = Arc::new(SuiClient::new(
        config::sui_rpc_url(),
        &config::sui_private_key(),
        timeout,
    )?);
    let storage_owner = sui.owner_address().to_string();
    let walrus = Arc::new(WalrusClient::new(config::walrus_upload_url(), timeout)?);
    info!(
        network = %config::sui_network(),
        publisher_evm_address = %publisher_evm_address,
        storage_owner = %storage_owner,
        "chain clients initialized"
    );

    // --- Core services ---
    let ledger = Arc::new(CreditLedger::new());
    let verifier = Arc::new(ReceiptVerifier::new(evm.clone()));
    let store_fee = config::store_fee_wei();
    let publisher = Arc::new(PublishService::new(
        ledger.clone(),
        walrus,
        sui,
        storage_owner.clone(),
        store_fee,
    ));

    let app_state = transport::http::AppState {
        ledger,
        verifier,
        publisher,
        evm,
        info: transport::http::types::ServiceInfo {
            publisher_evm_address,
            storage_owner,
            store_fee_wei: store_fee,
            network: config::sui_network(),
        },
    };

    // --- API server ---
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    let app = transport::http::create_router(app_state)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors);

    let addr = format!("0.0.0.0:{}", config::listen_port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "api server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
