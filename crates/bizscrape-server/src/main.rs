mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use bizscrape_core::Environment;
use bizscrape_scraper::Orchestrator;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    scheduler::{PgRunStore, RunStore, ScrapeScheduler, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(bizscrape_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(config = ?config, "configuration loaded");

    let pool = match &config.database_url {
        Some(_) => {
            let pool = bizscrape_db::connect_pool_from_config(&config).await?;
            let applied = bizscrape_db::run_migrations(&pool).await?;
            tracing::info!(applied, "database migrations complete");
            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; persistence and scheduled runs disabled");
            None
        }
    };

    let orchestrator = Arc::new(Orchestrator::new(config.scraper_settings())?);
    let store = pool
        .clone()
        .map(|pool| Arc::new(PgRunStore::new(pool)) as Arc<dyn RunStore>);
    let scheduler = Arc::new(ScrapeScheduler::new(
        Arc::clone(&orchestrator),
        store,
        config.scheduler_settings(),
        Arc::new(SystemClock),
    ));
    tracing::info!(timer_enabled = scheduler.timer_enabled(), "scheduler configured");
    scheduler.start();

    let auth = AuthState::from_env(matches!(config.env, Environment::Development))?;
    let app = build_app(
        AppState {
            pool,
            orchestrator,
            scheduler: Arc::clone(&scheduler),
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
