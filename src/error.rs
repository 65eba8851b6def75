use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule contains no activities")]
    EmptySchedule,

    #[error("duplicate task code '{code}'")]
    DuplicateTaskCode { code: String },

    #[error("unknown task code '{code}'")]
    UnknownTaskCode { code: String },

    #[error("natural key field '{field}' is not a column of snapshot {snapshot}")]
    NoCommonKey { field: String, snapshot: char },

    #[error("natural key must name at least one field")]
    EmptyNaturalKey,

    #[error("project '{project}' not found in source")]
    ProjectNotFound { project: String },

    #[error("unsupported schedule source '{}'", path.display())]
    UnsupportedSource { path: PathBuf },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("dataframe error: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ScheduleError {
    fn from(value: figment::Error) -> Self {
        Self::Config(Box::new(value))
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
