// src/fetch/mod.rs
use reqwest::blocking::Client;
use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::process::RawTable;

/// Daily per-state CSV published by the COVID Tracking Project.
pub const DEFAULT_SOURCE_URL: &str = "https://covidtracking.com/api/v1/states/daily.csv";

/// Fetch the current state daily CSV.
pub fn fetch_raw(client: &Client) -> Result<RawTable> {
    fetch_raw_from(client, DEFAULT_SOURCE_URL)
}

/// GET `url` and parse the body as CSV. Transport errors and non-2xx
/// statuses are returned as `Error::Fetch`; nothing is retried.
#[tracing::instrument(level = "info", skip(client))]
pub fn fetch_raw_from(client: &Client, url: &str) -> Result<RawTable> {
    let url = Url::parse(url)?;
    let fetch_err = |source: reqwest::Error| Error::Fetch {
        url: url.to_string(),
        source,
    };

    let body = client
        .get(url.clone())
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.bytes())
        .map_err(fetch_err)?;
    info!(bytes = body.len(), "downloaded source CSV");

    RawTable::from_reader(body.as_ref())
}
