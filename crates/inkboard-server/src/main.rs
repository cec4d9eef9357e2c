use clap::Parser;
use inkboard_server::{Args, RelayConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = RelayConfig::from(Args::parse());
    if let Err(e) = inkboard_server::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
