pub mod correction;
pub mod error;
pub mod fetch;
pub mod output;
pub mod policy;
pub mod process;
pub mod table;

pub use error::{Error, ParseError, Result};
pub use process::{process, RawTable};
pub use table::{CleanTable, Counts, SeriesKey};

use chrono::NaiveDate;
use reqwest::blocking::Client;

/// Fetch the live feed and clean it as of `run_date`.
pub fn fetch_and_process(run_date: NaiveDate) -> Result<CleanTable> {
    let client = Client::new();
    let raw = fetch::fetch_raw(&client)?;
    process(&raw, run_date)
}
