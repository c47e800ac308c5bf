use serde::Deserialize;

const MAIN_ACTOR_LIMIT: usize = 5;
const DIRECTOR_JOB: &str = "Director";

pub type MovieId = i64;

/// `GET /movie/{id}` body, only the fields we keep.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieDetail {
    /// Filled in from the requested id by the client when the body omits it.
    pub id: Option<MovieId>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub original_language: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub overview: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Genre {
    pub name: String,
}

/// `GET /movie/{id}/credits` body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieCredits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CastMember {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub original_language: Option<String>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    /// `None` when credits could not be fetched; `Some(vec![])` when the movie has no cast.
    pub main_actors: Option<Vec<String>>,
    pub director: Option<Vec<String>>,
}

/// Everything assembled for one ingestion year.
#[derive(Clone, Debug)]
pub struct Batch {
    pub year: i32,
    pub records: Vec<MovieRecord>,
}

impl Batch {
    pub fn new(year: i32) -> Self {
        Self { year, records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Merges a detail response and an optional credits response. No detail (or
/// no id on it), no record. Missing scalar fields stay `None`.
pub fn assemble(detail: Option<MovieDetail>, credits: Option<MovieCredits>) -> Option<MovieRecord> {
    let detail = detail?;

    let (main_actors, director) = match credits {
        Some(credits) => {
            let actors =
                credits.cast.into_iter().take(MAIN_ACTOR_LIMIT).map(|a| a.name).collect::<Vec<_>>();
            let directors = credits
                .crew
                .into_iter()
                .filter(|m| m.job == DIRECTOR_JOB)
                .map(|m| m.name)
                .collect::<Vec<_>>();
            (Some(actors), Some(directors))
        },
        None => (None, None),
    };

    Some(MovieRecord {
        id: detail.id?,
        title: detail.title,
        original_title: detail.original_title,
        release_date: detail.release_date,
        runtime: detail.runtime,
        popularity: detail.popularity,
        vote_average: detail.vote_average,
        vote_count: detail.vote_count,
        original_language: detail.original_language,
        genres: detail.genres.into_iter().map(|g| g.name).collect(),
        overview: detail.overview,
        main_actors,
        director,
    })
}
