use std::{net::SocketAddr, sync::Arc};

use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{error, info, warn};

use braip_tracker as api;
use api::config::{AppConfig, MirrorBackend};
use api::repositories::{
    DatabaseMirror, InMemoryOrderStore, NoopMirror, OrderMirror, PostgrestMirror,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let mirror = build_mirror(&cfg).await?;
    info!(mirror = mirror.name(), "persistence mirror selected");

    let hub = api::events::BroadcastHub::new(cfg.sse_subscriber_buffer);
    let store = Arc::new(InMemoryOrderStore::new());
    let orders = api::services::OrderService::new(store, mirror, hub.clone());

    if cfg.hydrate_on_startup && cfg.mirror_backend != MirrorBackend::None {
        if let Err(e) = orders.hydrate().await {
            warn!(error = %e, "could not hydrate orders from mirror; starting empty");
        }
    }

    let cors_layer = build_cors(&cfg)?;
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;

    let app = api::app(api::AppState::new(cfg, orders))
        .layer(CompressionLayer::new())
        .layer(cors_layer);

    info!("braip-tracker listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    api::serve(listener, app, hub, shutdown_signal()).await?;

    Ok(())
}

async fn build_mirror(
    cfg: &AppConfig,
) -> Result<Arc<dyn OrderMirror>, Box<dyn std::error::Error>> {
    let mirror: Arc<dyn OrderMirror> = match cfg.mirror_backend {
        MirrorBackend::None => Arc::new(NoopMirror),
        MirrorBackend::Postgrest => {
            let (Some(url), Some(key)) = (&cfg.postgrest_url, &cfg.postgrest_api_key) else {
                return Err(
                    "postgrest mirror requires APP__POSTGREST_URL and APP__POSTGREST_API_KEY".into(),
                );
            };
            Arc::new(PostgrestMirror::new(
                url,
                key.clone(),
                &cfg.postgrest_table,
                cfg.postgrest_timeout(),
            )?
            .with_board_status(cfg.postgrest_board_status))
        }
        MirrorBackend::Database => {
            let Some(db_config) = api::db::DbConfig::from_app(cfg) else {
                return Err("database mirror requires APP__DATABASE_URL".into());
            };
            let db = api::db::connect(&db_config).await?;
            Arc::new(DatabaseMirror::new(Arc::new(db)))
        }
    };
    Ok(mirror)
}

fn build_cors(cfg: &AppConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
