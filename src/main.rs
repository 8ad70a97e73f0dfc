use std::sync::Arc;

use tfl_mcp_server::{build_app, config::Config, logging, tfl_client::TflClient, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let transit = Arc::new(TflClient::new(
        config.tfl_api_key.clone(),
        config.tfl_base_url.clone(),
    )?);
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(config.api_token.clone(), transit);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        upstream = %config.tfl_base_url,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
