//! Resume Reviewer HTTP server

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use resume_reviewer::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
    upstream::GenerationSettings,
    warmup,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        match output {
            Some(path) => {
                std::fs::write(path, generate_config_template())?;
                eprintln!("Configuration template written to {path}");
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    let (config_path, explicit) = cli.config_path();
    let config = Config::load(config_path, explicit)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        model = %config.upstream.model(),
        upstream = %config.upstream.base_url(),
        stream = config.upstream.stream(),
        cache_capacity = config.cache.capacity,
        "Starting resume reviewer on {}:{}",
        config.server.host,
        config.server.port
    );

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = AppState::new(config)?;

    if state.config().upstream.warmup() {
        // Detached; the server starts accepting requests immediately
        let _ = warmup::spawn(
            Arc::clone(state.upstream()),
            GenerationSettings::from(&state.config().upstream),
        );
    }

    let app = handlers::router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
