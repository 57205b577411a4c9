use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use covidclean::{
    fetch,
    output::{self, OutputFormat},
    process, RawTable,
};
use reqwest::blocking::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Fetch COVID Tracking Project state data and write cleaned daily counts.
#[derive(Parser, Debug)]
struct Args {
    /// As-of date; this date and later are cut from the output (default: today)
    #[arg(long)]
    run_date: Option<NaiveDate>,

    /// Read a saved copy of the state daily CSV instead of fetching it
    #[arg(long)]
    input: Option<PathBuf>,

    /// Where to write the cleaned table
    #[arg(long, default_value = "covidtracking_clean.csv")]
    output: PathBuf,

    /// Output format (default: from the output extension, else csv)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    let run_date = args.run_date.unwrap_or_else(|| Local::now().date_naive());
    let format = args
        .format
        .unwrap_or_else(|| OutputFormat::from_path(&args.output));
    info!(%run_date, output = %args.output.display(), ?format, "startup");

    // ─── 2) load raw feed ────────────────────────────────────────────
    let raw = match &args.input {
        Some(path) => RawTable::from_path(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?,
        None => fetch::fetch_raw(&Client::new()).context("fetching state daily CSV")?,
    };
    info!(rows = raw.rows.len(), "loaded raw feed");

    // ─── 3) clean ────────────────────────────────────────────────────
    let table = process(&raw, run_date).context("processing state daily CSV")?;

    // ─── 4) write ────────────────────────────────────────────────────
    output::write_table(&table, &args.output, format)?;

    info!("all done");
    Ok(())
}
