//! # tesserad: Binary Entry Point
//!
//! Starts the Axum HTTP server for the proof daemon.
//! Binds to configurable port (default 8080).

use tessera_api::state::{AppConfig, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Text);
            tracing::error!("Invalid configuration: {e}");
            return Err(e.into());
        }
    };
    init_tracing(config.log_format);

    let state = tessera_api::bootstrap::bootstrap(&config)
        .await
        .map_err(|e| {
            tracing::error!("Bootstrap failed: {e}");
            e
        })?;

    let app = tessera_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("tesserad listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
