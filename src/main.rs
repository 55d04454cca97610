use listing_radar::MonitorConfig;
use listing_radar::jobs::listing_monitor::run_listing_monitor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listing_radar=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env();

    tracing::info!("Starting listing radar...");
    if let Err(e) = run_listing_monitor(config).await {
        tracing::error!("Listing monitor failed to start: {}", e);
        std::process::exit(1);
    }
}
