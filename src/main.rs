use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restation::{ServerConfig, build_router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    if config.kakao_map_key.is_none() {
        tracing::warn!("KAKAO_MAP_KEY is not set; /api/kakao will answer 503");
    }
    tracing::info!("serving static files from {}", config.public_dir.display());

    let app = build_router(&config);
    let address = config.socket_addr();

    tracing::info!("listening on http://{}", address);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .await
        .expect("server error");
}
