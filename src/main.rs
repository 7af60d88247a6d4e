use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use club_booking::cache::AppCache;
use club_booking::clients::{HttpBookingGateway, HttpMemberDirectory};
use club_booking::config::Config;
use club_booking::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "club_booking=info,tower_http=info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    let directory = HttpMemberDirectory::new(config.member_directory_url.clone(), config.http_timeout)
        .context("building member directory client")?;
    let gateway = HttpBookingGateway::new(config.booking_api_url.clone(), config.http_timeout)
        .context("building booking gateway client")?;

    let state = AppState {
        db,
        cache: AppCache::new(config.session_idle),
        config: Arc::new(config.clone()),
        directory: Arc::new(directory),
        gateway: Arc::new(gateway),
    };

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Club booking listening on {}", config.bind_addr);

    axum::serve(listener, club_booking::app(state)).await?;

    Ok(())
}
