use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, TransactionTrait,
    sea_query::{Alias, Query, SimpleExpr},
};
use tracing::{debug, info};

use crate::{
    config::Config,
    entities::tmdb_movie,
    error::AppResult,
    models::{Batch, MovieRecord},
    retry::{RetryPolicy, Sleeper},
};

const LIST_SEPARATOR: &str = ", ";
const INSERT_CHUNK: usize = 500;

/// A record flattened into one storable row: lists are joined, the year is attached.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieRow {
    pub id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub original_language: Option<String>,
    pub genres: String,
    pub overview: Option<String>,
    pub main_actors: Option<String>,
    pub director: Option<String>,
    pub year: i32,
}

impl MovieRow {
    pub fn from_record(record: &MovieRecord, year: i32) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            original_title: record.original_title.clone(),
            release_date: record.release_date.clone(),
            runtime: record.runtime,
            popularity: record.popularity,
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            original_language: record.original_language.clone(),
            genres: join_list(&record.genres),
            overview: record.overview.clone(),
            main_actors: record.main_actors.as_deref().map(join_list),
            director: record.director.as_deref().map(join_list),
            year,
        }
    }

    fn into_values(self) -> Vec<SimpleExpr> {
        vec![
            self.id.into(),
            self.title.into(),
            self.original_title.into(),
            self.release_date.into(),
            self.runtime.into(),
            self.popularity.into(),
            self.vote_average.into(),
            self.vote_count.into(),
            self.original_language.into(),
            self.genres.into(),
            self.overview.into(),
            self.main_actors.into(),
            self.director.into(),
            self.year.into(),
        ]
    }
}

fn join_list(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

pub fn to_rows(batch: &Batch) -> Vec<MovieRow> {
    batch.records.iter().map(|r| MovieRow::from_record(r, batch.year)).collect()
}

pub struct MovieStore {
    database_url: String,
    policy: RetryPolicy,
}

impl MovieStore {
    pub fn new(config: &Config) -> Self {
        Self { database_url: config.database_url.clone(), policy: RetryPolicy::default() }
    }

    /// Appends the whole batch to `table`, creating it when absent. Opens its own connection.
    pub async fn upload(&self, batch: &Batch, table: &str) -> AppResult<()> {
        let rows = to_rows(batch);
        let db = Database::connect(&self.database_url).await?;

        ensure_table(&db, table).await?;

        let txn = db.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut insert = Query::insert();
            insert.into_table(Alias::new(table)).columns([
                tmdb_movie::Column::Id,
                tmdb_movie::Column::Title,
                tmdb_movie::Column::OriginalTitle,
                tmdb_movie::Column::ReleaseDate,
                tmdb_movie::Column::Runtime,
                tmdb_movie::Column::Popularity,
                tmdb_movie::Column::VoteAverage,
                tmdb_movie::Column::VoteCount,
                tmdb_movie::Column::OriginalLanguage,
                tmdb_movie::Column::Genres,
                tmdb_movie::Column::Overview,
                tmdb_movie::Column::MainActors,
                tmdb_movie::Column::Director,
                tmdb_movie::Column::Year,
            ]);
            for row in chunk {
                insert.values(row.clone().into_values()).map_err(|e| DbErr::Custom(e.to_string()))?;
            }
            txn.execute(txn.get_database_backend().build(&insert)).await?;
            debug!(table = %table, rows = chunk.len(), "inserted chunk");
        }
        txn.commit().await?;
        db.close().await?;

        info!(table = %table, year = batch.year, rows = rows.len(), "uploaded batch");
        Ok(())
    }

    pub async fn upload_with_retry<S: Sleeper>(
        &self,
        batch: &Batch,
        table: &str,
        sleeper: &S,
    ) -> AppResult<()> {
        self.policy.run(sleeper, "database upload", || self.upload(batch, table)).await
    }
}

async fn ensure_table(db: &DatabaseConnection, table: &str) -> AppResult<()> {
    let backend = db.get_database_backend();
    let mut create = Schema::new(backend).create_table_from_entity(tmdb_movie::Entity);
    create.table(Alias::new(table)).if_not_exists();
    db.execute(backend.build(&create)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{EntityTrait, QueryOrder};

    use super::*;
    use crate::retry::tests::RecordingSleeper;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn record(id: i64, genres: &[&str]) -> MovieRecord {
        MovieRecord {
            id,
            title: Some(format!("Movie {id}")),
            original_title: Some(format!("Movie {id}")),
            release_date: Some("2023-05-01".to_string()),
            runtime: Some(100),
            popularity: Some(12.5),
            vote_average: Some(7.1),
            vote_count: Some(321),
            original_language: Some("en".to_string()),
            genres: owned(genres),
            overview: None,
            main_actors: None,
            director: None,
        }
    }

    fn with_credits(mut record: MovieRecord, cast: &[&str], directors: &[&str]) -> MovieRecord {
        record.main_actors = Some(owned(cast));
        record.director = Some(owned(directors));
        record
    }

    fn store_at(dir: &tempfile::TempDir) -> MovieStore {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("movies.db").display());
        let mut config = crate::tmdb::tests::test_config("http://unused");
        config.database_url = url;
        MovieStore::new(&config)
    }

    #[test]
    fn flattens_lists_and_keeps_absent_fields_absent() {
        let batch = Batch {
            year: 2022,
            records: vec![
                with_credits(record(1, &["Action", "Drama"]), &["Ann", "Bob"], &["Cy"]),
                record(2, &[]),
            ],
        };

        let rows = to_rows(&batch);
        assert_eq!(rows[0].genres, "Action, Drama");
        assert_eq!(rows[0].main_actors.as_deref(), Some("Ann, Bob"));
        assert_eq!(rows[0].director.as_deref(), Some("Cy"));
        assert_eq!(rows[1].genres, "");
        assert_eq!(rows[1].main_actors, None);
        assert_eq!(rows[1].director, None);
        assert!(rows.iter().all(|r| r.year == 2022));
    }

    #[test]
    fn fetched_but_empty_credits_become_empty_strings() {
        let batch = Batch { year: 2021, records: vec![with_credits(record(3, &["Horror"]), &[], &[])] };
        let rows = to_rows(&batch);
        assert_eq!(rows[0].main_actors.as_deref(), Some(""));
        assert_eq!(rows[0].director.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn upload_appends_rows_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);

        let first = Batch { year: 2021, records: vec![record(1, &["Drama"])] };
        let second = Batch {
            year: 2022,
            records: vec![record(1, &["Drama"]), with_credits(record(2, &["Comedy"]), &["Dee"], &["Eve"])],
        };
        store.upload(&first, "tmdb_movies").await.unwrap();
        store.upload(&second, "tmdb_movies").await.unwrap();

        let db = Database::connect(&store.database_url).await.unwrap();
        let rows = tmdb_movie::Entity::find()
            .order_by_asc(tmdb_movie::Column::RowId)
            .all(&db)
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].id, rows[0].year), (1, 2021));
        assert_eq!((rows[1].id, rows[1].year), (1, 2022));
        assert_eq!(rows[2].main_actors.as_deref(), Some("Dee"));
        assert_eq!(rows[2].director.as_deref(), Some("Eve"));
        assert_eq!(rows[1].main_actors, None);
        assert_eq!(rows[2].genres, "Comedy");
    }

    #[tokio::test]
    async fn unknown_catalog_values_are_stored_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);

        let mut sparse = record(4, &[]);
        sparse.title = None;
        sparse.popularity = None;
        sparse.vote_average = None;
        sparse.vote_count = None;
        sparse.original_language = None;
        let long_title = "L".repeat(300);
        let mut epic = record(5, &["History"]);
        epic.title = Some(long_title.clone());

        store.upload(&Batch { year: 2023, records: vec![sparse, epic] }, "tmdb_movies").await.unwrap();

        let db = Database::connect(&store.database_url).await.unwrap();
        let rows = tmdb_movie::Entity::find()
            .order_by_asc(tmdb_movie::Column::RowId)
            .all(&db)
            .await
            .unwrap();

        assert_eq!(rows[0].title, None);
        assert_eq!(rows[0].popularity, None);
        assert_eq!(rows[0].vote_average, None);
        assert_eq!(rows[0].vote_count, None);
        assert_eq!(rows[0].original_language, None);
        assert_eq!(rows[1].title.as_deref(), Some(long_title.as_str()));
        assert_eq!(rows[1].vote_count, Some(321));
    }

    #[tokio::test]
    async fn schema_errors_fail_without_retrying() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_at(&dir);

        let db = Database::connect(&store.database_url).await.unwrap();
        db.execute_unprepared("CREATE TABLE tmdb_movies (row_id INTEGER PRIMARY KEY)").await.unwrap();
        db.close().await.unwrap();

        let sleeper = RecordingSleeper::default();
        let batch = Batch { year: 2024, records: vec![record(5, &["War"])] };
        let err = store.upload_with_retry(&batch, "tmdb_movies", &sleeper).await.unwrap_err();

        assert!(!err.is_transient());
        assert!(sleeper.slept_secs().is_empty());
    }

    #[tokio::test]
    async fn unreachable_database_is_retried_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("missing").join("movies.db").display());
        let mut config = crate::tmdb::tests::test_config("http://unused");
        config.database_url = url;
        let store = MovieStore::new(&config);

        let sleeper = RecordingSleeper::default();
        let batch = Batch { year: 2025, records: vec![record(6, &[])] };
        let err = store.upload_with_retry(&batch, "tmdb_movies", &sleeper).await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(sleeper.slept_secs(), vec![5, 10, 15, 20]);
    }
}
