//! Companion entry-point: loads settings, selects adapters and serves the API.

mod server;

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use companion::inbound::http::health::HealthState;
use companion::inbound::ws::state::AllowedOrigins;
use companion::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use companion::outbound::presence::RedisPresenceRegistry;
use companion::outbound::push::{FcmConfig, FcmPushGateway, ServiceAccountCredential};
use companion::outbound::storage::LocalObjectStorage;
use companion::settings::CompanionSettings;

use server::{ServerConfig, create_server};

/// Expiry applied to a room's presence set after its last join.
const PRESENCE_TTL: std::time::Duration = std::time::Duration::from_secs(6 * 60 * 60);

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = CompanionSettings::load()
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let config = build_server_config(&settings).await?;

    let health_state = web::Data::new(HealthState::new());
    info!(bind_addr = %config.bind_addr(), "starting companion server");
    create_server(health_state, config)?.await
}

async fn build_server_config(settings: &CompanionSettings) -> std::io::Result<ServerConfig> {
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let day_boundary = settings.day_boundary().map_err(std::io::Error::other)?;
    let storage = LocalObjectStorage::open(&settings.upload_dir(), settings.upload_base_url())?;

    let mut config = ServerConfig::new(bind_addr, Arc::new(storage))
        .with_day_boundary(day_boundary)
        .with_allowed_origins(AllowedOrigins::new(settings.ws_allowed_origins()));

    match settings.database_url() {
        Some(url) => {
            run_pending_migrations(url)
                .await
                .map_err(std::io::Error::other)?;
            let pool = DbPool::new(
                PoolConfig::new(url).with_max_connections(settings.database_max_connections()),
            )
            .await
            .map_err(std::io::Error::other)?;
            config = config.with_db_pool(pool);
        }
        None => warn!("no database configured; using in-memory persistence"),
    }

    match settings.redis_url() {
        Some(url) => {
            let presence = RedisPresenceRegistry::connect(url, PRESENCE_TTL)
                .await
                .map_err(std::io::Error::other)?;
            config = config.with_presence(Arc::new(presence));
        }
        None => info!("no redis configured; presence is tracked in-process"),
    }

    match settings.fcm() {
        Some(fcm) => {
            let timeout = settings.push_timeout();
            let http = FcmPushGateway::http_client(timeout).map_err(std::io::Error::other)?;
            let credential = ServiceAccountCredential::from_path(
                fcm.service_account_path,
                http.clone(),
                Arc::new(DefaultClock),
            );
            let gateway = FcmPushGateway::new(
                http,
                Arc::new(credential),
                FcmConfig::new(fcm.project_id, timeout),
            );
            config = config.with_push(Arc::new(gateway));
        }
        None => warn!("push credentials not configured; notifications are logged only"),
    }

    Ok(config)
}
