mod config;
mod entities;
mod error;
mod models;
mod pipeline;
mod retry;
mod store;
mod tmdb;

use std::time::Duration;

use crate::{config::Config, retry::TokioSleeper, store::MovieStore, tmdb::TmdbClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tmdb_ingest=debug,sqlx=warn,sea_orm=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("tmdb-ingest/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let tmdb = TmdbClient::new(http, &config);
    let store = MovieStore::new(&config);

    pipeline::run(&tmdb, &store, pipeline::YEARS, &TokioSleeper).await?;

    tracing::info!("ingestion finished");
    Ok(())
}
