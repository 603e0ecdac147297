mod address;
mod config;
mod content;
mod error;
mod history_sync;
mod http;
mod qr;
mod session;
mod store;

use config::AppConfig;
use error::{Error, Result};
use history_sync::HistorySyncController;
use rand::RngCore;
use session::SessionManager;
use std::sync::Arc;
use store::Store;
use tokio::signal::unix::{SignalKind, signal};

const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(5);

fn load_or_create_api_key(config: &AppConfig) -> Result<String> {
    let path = config.api_key_path();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let key = existing.trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let key = hex::encode(bytes);

    std::fs::write(&path, &key).map_err(|e| Error::Fatal(format!("failed to write api key: {e}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Fatal(format!("failed to chmod api key: {e}")))?;
    }

    tracing::info!(path = %path.display(), "generated new API key");
    Ok(key)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wa_bridge=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "bridge exited with a fatal error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::from_env();
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| Error::Fatal(format!("failed to create data dir: {e}")))?;

    let api_key = load_or_create_api_key(&config)?;

    let store = Arc::new(Store::open(&config.app_db_path())?);
    let session = SessionManager::start(&config, store).await?;
    let history_sync = HistorySyncController::new(session.clone());

    let state = http::AppState {
        session: session.clone(),
        history_sync,
        api_key: Arc::from(api_key.as_str()),
    };
    let router = http::build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Fatal(format!("failed to bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Fatal(format!("server error: {e}")))?;

    tracing::info!("server stopped, tearing down session");
    if let Ok(handle) = session.handle() {
        tokio::time::timeout(SHUTDOWN_GRACE, handle.disconnect()).await.ok();
    }

    Ok(())
}
