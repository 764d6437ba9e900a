mod channel;
mod format;
mod monitor;
mod source;
mod store;
mod templates;

use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use abcwatch_scraper::{CityCache, SearchClient};

use crate::channel::TelegramChannel;
use crate::monitor::{Monitor, MonitorConfig};
use crate::store::PgStore;
use crate::templates::MessageTemplates;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = abcwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(?config, "loaded configuration");

    let pool_config = abcwatch_db::PoolConfig::from_app_config(&config);
    let pool = abcwatch_db::connect_pool(&config.database_url, pool_config).await?;
    abcwatch_db::run_migrations(&pool).await?;

    let source = SearchClient::new(
        config.search_url.clone(),
        config.request_timeout_secs,
        &config.user_agent,
        config.max_results,
    )?;
    let locator_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()?;
    let cities = CityCache::new(
        locator_client,
        config.store_locator_url.clone(),
        Duration::from_secs(config.city_cache_ttl_secs),
    );
    let channel = TelegramChannel::new(
        &config.telegram_api_base,
        &config.bot_token,
        config.request_timeout_secs,
    )?;

    let monitor = Monitor::new(
        PgStore::new(pool),
        source,
        channel,
        cities,
        MessageTemplates::default(),
        MonitorConfig {
            check_interval: Duration::from_secs(config.check_interval_minutes * 60),
            inter_keyword_delay: Duration::from_millis(config.inter_keyword_delay_ms),
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    monitor.run(shutdown_rx).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
