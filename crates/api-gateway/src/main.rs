use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::{config::GatewayConfig, cors, metrics::register_metrics, routes, state::AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    let port = config.port;

    tracing::info!("Starting api-gateway on port {} ({})", port, config.environment);
    for (prefix, backend) in config.routes.entries() {
        tracing::info!(
            prefix = %prefix,
            service = %backend.name,
            target = %backend.base_url,
            health = %backend.health_url(),
            "route"
        );
    }
    tracing::info!(
        "Forward timeout: {:?}, probe timeout: {:?}",
        config.forward_timeout,
        config.probe_timeout
    );

    // Register Prometheus metrics
    if let Err(e) = register_metrics() {
        tracing::warn!("Failed to register metrics: {e}");
    }

    // Create shared state
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {e}");
            std::process::exit(1);
        }
    };
    let state_data = web::Data::new(state);

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(from_fn(cors::cors_stage))
            .wrap(Logger::default())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
