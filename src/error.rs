// src/error.rs
use chrono::NaiveDate;
use thiserror::Error;

/// Everything that can stop a fetch-and-clean run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("fetching {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid source URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid correction policy: {0}")]
    Policy(String),
}

/// Schema and value problems in the raw dataset.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("row {row}: invalid date `{value}` (expected YYYYMMDD)")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}: invalid {column} value `{value}`")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("{region} on {date}: {column} count overflows i64")]
    Overflow {
        region: String,
        date: NaiveDate,
        column: &'static str,
    },

    #[error("row {row}: duplicate entry for {region} on {date}")]
    DuplicateRow {
        row: usize,
        region: String,
        date: NaiveDate,
    },
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Parse(ParseError::Csv(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
