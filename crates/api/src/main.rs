use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::PgPool;

use userdir_api::app;
use userdir_api::config::Config;
use userdir_infra::{PgUserStore, run_migrations};

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    userdir_observability::init();

    let config = Config::from_env();

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let store = Arc::new(PgUserStore::new(pool));
    let app = app::build_app(store);

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    // Serve on a task so the signal wait and the bounded drain stay here.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    tracing::info!("shutdown signal received; draining in-flight requests");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(joined) => joined.context("server task panicked")??,
        Err(_) => {
            tracing::warn!("drain timed out; abandoning in-flight requests");
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl-C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
