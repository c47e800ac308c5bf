use std::ops::RangeInclusive;

use tracing::{debug, info, warn};

use crate::{
    error::AppResult,
    models::{Batch, assemble},
    retry::Sleeper,
    store::MovieStore,
    tmdb::TmdbClient,
};

pub const YEARS: RangeInclusive<i32> = 2021..=2025;
pub const MAX_PAGES: u32 = 10;
pub const TABLE: &str = "tmdb_movies";

const PROGRESS_EVERY: usize = 10;

/// Discovers and assembles every movie for one year. Strictly sequential:
/// detail then credits per id, followed by the client's fixed pause whether
/// or not a record came out of it.
pub async fn collect_year<C: Sleeper>(
    tmdb: &TmdbClient<C>,
    year: i32,
    max_pages: u32,
) -> AppResult<Batch> {
    let ids = tmdb.discover_movie_ids(year, max_pages).await?;
    debug!(year = year, discovered = ids.len(), "discovered movie ids");

    let mut batch = Batch::new(year);
    let mut misses = 0usize;

    for (idx, &id) in ids.iter().enumerate() {
        let detail = tmdb.fetch_movie_detail(id).await?.found();
        let credits = tmdb.fetch_movie_credits(id).await?.found();

        match assemble(detail, credits) {
            Some(record) => batch.records.push(record),
            None => {
                debug!(year = year, movie_id = id, "no detail, skipping");
                misses += 1;
            },
        }

        if idx % PROGRESS_EVERY == 0 {
            info!(year = year, "fetched {}/{} movies", idx + 1, ids.len());
        }

        tmdb.pause().await;
    }

    info!(
        year = year,
        discovered = ids.len(),
        assembled = batch.len(),
        misses = misses,
        "year collected"
    );
    Ok(batch)
}

pub async fn run<C: Sleeper, S: Sleeper>(
    tmdb: &TmdbClient<C>,
    store: &MovieStore,
    years: RangeInclusive<i32>,
    sleeper: &S,
) -> AppResult<()> {
    for year in years {
        info!(year = year, "processing year");
        let batch = collect_year(tmdb, year, MAX_PAGES).await?;

        if batch.is_empty() {
            warn!(year = year, "no data found, skipping upload");
            continue;
        }

        info!(year = year, movies = batch.len(), table = TABLE, "uploading");
        store.upload_with_retry(&batch, TABLE, sleeper).await?;
    }
    Ok(())
}
