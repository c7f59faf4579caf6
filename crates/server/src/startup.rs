use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::AppConfig;
use service::{
    auth::{repo::seaorm::SeaOrmAuthRepository, AuthService, AuthSettings},
    feed::FeedHub,
    media::image_host_from_config,
    notify::{mailer_from_config, Sender},
    visitors::{repo::seaorm::SeaOrmVisitorRepository, VisitorService},
};

use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// `config.toml` when present, otherwise environment only.
fn load_config() -> anyhow::Result<AppConfig> {
    match AppConfig::load_and_validate() {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(error = %e, "config file unavailable; using environment");
            AppConfig::from_env()
        }
    }
}

/// Wire repositories, integrations and services from config.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<ServerState> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;

    let http = reqwest::Client::builder().user_agent("gatelog-server").build()?;
    let mailer = mailer_from_config(&cfg.mail, http.clone());
    let images = image_host_from_config(&cfg.images, http);
    let sender = Sender::from_config(&cfg.mail);

    let users = Arc::new(SeaOrmAuthRepository::new(db.clone()));
    let auth = AuthService::new(users.clone(), AuthSettings::from_config(&cfg.auth));
    let visitors = VisitorService::new(
        Arc::new(SeaOrmVisitorRepository::new(db)),
        users,
        FeedHub::new(cfg.server.feed_capacity),
        mailer.clone(),
        sender.clone(),
    );
    Ok(ServerState { auth, visitors, images, mailer, sender })
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = load_config()?;

    let state = build_state(&cfg).await?;
    if !cfg.mail.enabled {
        info!("mail disabled; notifications are logged only");
    }

    let app: Router = routes::build_router(state, build_cors());

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting gatelog server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
