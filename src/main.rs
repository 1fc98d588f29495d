use std::sync::Arc;

use ambulance_notifier::{
    NotifierError, NotifierResult,
    config::AppConfig,
    handlers,
    state::AppState,
    telemetry,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("ambulance-notifier: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> NotifierResult<()> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)
        .map_err(|e| NotifierError::InvalidConfiguration(e.to_string()))?;

    let addr = config.server.socket_addr()?;
    tracing::info!(
        "Starting ambulance-notifier for project {} ({:?})",
        config.google.project_id,
        config.environment
    );

    let app_state = AppState::new(config)?;
    let app = handlers::router(Arc::new(app_state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening for request events on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
