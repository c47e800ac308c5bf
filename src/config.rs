use crate::error::{AppError, AppResult};

const REQUIRED: [&str; 6] = [
    "TMDB_API_KEY",
    "MYSQL_HOST",
    "MYSQL_PORT",
    "MYSQL_USER",
    "MYSQL_PASSWORD",
    "MYSQL_DATABASE",
];

#[derive(Clone, Debug)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_rps: u32,
    pub tmdb_delay_ms: u64,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let missing: Vec<String> =
            REQUIRED.iter().filter(|key| lookup(key).is_none()).map(|key| key.to_string()).collect();
        if !missing.is_empty() {
            return Err(AppError::MissingEnv(missing));
        }
        let var = |key: &str| lookup(key).unwrap_or_default();

        let port: u16 = var("MYSQL_PORT")
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("MYSQL_PORT is not a port: {}", var("MYSQL_PORT"))))?;

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| {
            format!(
                "mysql://{}:{}@{}:{}/{}",
                urlencoding::encode(&var("MYSQL_USER")),
                urlencoding::encode(&var("MYSQL_PASSWORD")),
                var("MYSQL_HOST"),
                port,
                var("MYSQL_DATABASE"),
            )
        });

        let tmdb_base_url =
            lookup("TMDB_BASE_URL").unwrap_or_else(|| "https://api.themoviedb.org/3".to_string());

        let tmdb_rps: u32 = lookup("TMDB_RPS").and_then(|s| s.parse().ok()).unwrap_or(20);

        let tmdb_delay_ms: u64 = lookup("TMDB_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(250);

        Ok(Self { tmdb_api_key: var("TMDB_API_KEY"), tmdb_base_url, tmdb_rps, tmdb_delay_ms, database_url })
    }
}
