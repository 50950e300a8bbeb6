use std::net::SocketAddr;
use std::sync::Arc;

use confetti::config::ServerConfig;
use confetti::http::{AppState, router};
use confetti::keys::{KeyMaterial, loader_for};
use confetti::mailer::LogMailer;
use confetti::time::SystemTimeSource;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confetti=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen_port={}, key_loader={:?}, access_token_ttl={:?}",
        config.listen_port,
        config.key_loader,
        config.access_token_ttl
    );

    // The key must be in hand before anything binds.
    let loader = match loader_for(&config) {
        Ok(loader) => loader,
        Err(e) => {
            tracing::error!("Failed to create key loader: {e}");
            std::process::exit(1);
        }
    };
    let private_key = match loader.load(&config.private_key).await {
        Ok(key) => key,
        Err(e) => {
            tracing::error!("Failed to load private key: {e}");
            std::process::exit(1);
        }
    };
    let keys = Arc::new(KeyMaterial::new(private_key));
    tracing::info!("Private key loaded: {keys:?}");

    let state = match AppState::build(
        keys,
        &config,
        Arc::new(SystemTimeSource),
        Arc::new(LogMailer),
    ) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize services: {e}");
            std::process::exit(1);
        }
    };
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
