use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roastmywallet_backend::{app, AppState, Config, ExpenseStore, JwksClient, LlmClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RoastMyWallet API");

    // Initialize components
    let jwks_client = JwksClient::new(&config.oidc.issuer, &config.oidc.audience).await?;
    let llm = LlmClient::new(&config.llm.base_url, &config.llm.api_key, &config.llm.model);
    let store = ExpenseStore::new(&config.database.url)?;

    let state = Arc::new(AppState {
        config: config.clone(),
        jwks_client,
        llm,
        store,
    });

    let app = app(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
