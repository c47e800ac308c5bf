use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::AppResult,
    models::{MovieCredits, MovieDetail, MovieId},
    retry::{Sleeper, TokioSleeper},
};

/// Outcome of a single catalog read. Transport failures are the `Err` side of
/// the surrounding `AppResult`; a non-200 status is just missing data.
#[derive(Debug)]
pub enum Fetch<T> {
    Found(T),
    Missing(StatusCode),
}

impl<T> Fetch<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Fetch::Found(value) => Some(value),
            Fetch::Missing(_) => None,
        }
    }
}

pub struct TmdbClient<S = TokioSleeper> {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    delay: Duration,
    sleeper: S,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        let rps = NonZeroU32::new(config.tmdb_rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self {
            client,
            api_key: config.tmdb_api_key.clone(),
            base_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            delay: Duration::from_millis(config.tmdb_delay_ms),
            sleeper: TokioSleeper,
            limiter,
        }
    }
}

impl<S: Sleeper> TmdbClient<S> {
    /// The fixed pause between catalog requests.
    pub async fn pause(&self) {
        self.sleeper.sleep(self.delay).await;
    }

    /// Popularity-ordered ids released in `year`, across at most `max_pages` pages.
    /// A non-200 page ends pagination quietly with whatever was collected.
    pub async fn discover_movie_ids(&self, year: i32, max_pages: u32) -> AppResult<Vec<MovieId>> {
        let url = format!("{}/discover/movie", self.base_url);
        let mut ids = Vec::new();

        for page in 1..=max_pages {
            debug!(year = year, page = page, "fetching discover page");

            self.limiter.until_ready().await;
            let resp = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str()), ("sort_by", "popularity.desc")])
                .query(&[("primary_release_year", year), ("page", page as i32)])
                .send()
                .await?;

            if resp.status() != StatusCode::OK {
                warn!(year = year, page = page, status = %resp.status(), "discover stopped early");
                break;
            }

            let body: DiscoverResponse = resp.json().await?;
            if body.results.is_empty() {
                break;
            }
            ids.extend(body.results.into_iter().map(|m| m.id));

            if page >= body.total_pages.unwrap_or(1) {
                break;
            }

            self.pause().await;
        }

        Ok(ids)
    }

    pub async fn fetch_movie_detail(&self, id: MovieId) -> AppResult<Fetch<MovieDetail>> {
        let fetched: Fetch<MovieDetail> = self.get_json(format!("{}/movie/{}", self.base_url, id)).await?;
        Ok(match fetched {
            Fetch::Found(mut detail) => {
                detail.id.get_or_insert(id);
                Fetch::Found(detail)
            },
            missing => missing,
        })
    }

    pub async fn fetch_movie_credits(&self, id: MovieId) -> AppResult<Fetch<MovieCredits>> {
        self.get_json(format!("{}/movie/{}/credits", self.base_url, id)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> AppResult<Fetch<T>> {
        self.limiter.until_ready().await;

        let resp = self.client.get(&url).query(&[("api_key", &self.api_key)]).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            debug!(url = %url, status = %status, "no data");
            return Ok(Fetch::Missing(status));
        }

        Ok(Fetch::Found(resp.json().await?))
    }
}

#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    #[serde(default)]
    results: Vec<DiscoverMovie>,
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DiscoverMovie {
    id: MovieId,
}
