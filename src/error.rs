use sea_orm::{DbErr, RuntimeErr, sqlx};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Db(#[from] DbErr),
}

impl AppError {
    /// Connection-level database failures worth another attempt. Query,
    /// constraint and schema errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Db(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) => true,
            AppError::Db(DbErr::Exec(err) | DbErr::Query(err)) => is_transient_runtime(err),
            _ => false,
        }
    }
}

fn is_transient_runtime(err: &RuntimeErr) -> bool {
    match err {
        RuntimeErr::SqlxError(err) => matches!(
            err,
            sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
        ),
        _ => false,
    }
}

pub type AppResult<T> = Result<T, AppError>;
