// src/output/mod.rs
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Int64Array, StringArray},
    datatypes::{DataType, Date32Type, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use serde::Serialize;
use std::{fs::File, io::BufWriter, path::Path, sync::Arc};
use tracing::info;

use crate::table::CleanTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Parquet,
}

impl OutputFormat {
    /// Guess from the file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => OutputFormat::Json,
            Some("parquet") => OutputFormat::Parquet,
            _ => OutputFormat::Csv,
        }
    }
}

/// One flattened output row.
#[derive(Debug, Serialize)]
struct Row<'a> {
    region: &'a str,
    date: NaiveDate,
    positive: i64,
    total: i64,
}

fn rows(table: &CleanTable) -> impl Iterator<Item = Row<'_>> {
    table.iter().map(|(k, c)| Row {
        region: &k.region,
        date: k.date,
        positive: c.positive,
        total: c.total,
    })
}

/// Write `table` to `path` with columns `region, date, positive, total`.
pub fn write_table(table: &CleanTable, path: &Path, format: OutputFormat) -> Result<()> {
    let written = match format {
        OutputFormat::Csv => write_csv(table, path),
        OutputFormat::Json => write_json(table, path),
        OutputFormat::Parquet => write_parquet(table, path),
    };
    written.with_context(|| format!("writing {:?} output to {}", format, path.display()))?;

    info!(path = %path.display(), rows = table.len(), ?format, "wrote cleaned table");
    Ok(())
}

fn write_csv(table: &CleanTable, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows(table) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_json(table: &CleanTable, path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let all: Vec<Row<'_>> = rows(table).collect();
    serde_json::to_writer_pretty(&mut out, &all)?;
    Ok(())
}

fn arrow_schema() -> Schema {
    Schema::new(vec![
        Field::new("region", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("positive", DataType::Int64, false),
        Field::new("total", DataType::Int64, false),
    ])
}

fn to_record_batch(table: &CleanTable) -> Result<RecordBatch> {
    let schema = Arc::new(arrow_schema());
    let regions: StringArray = table.iter().map(|(k, _)| Some(k.region.as_str())).collect();
    let dates =
        Date32Array::from_iter_values(table.iter().map(|(k, _)| Date32Type::from_naive_date(k.date)));
    let positive = Int64Array::from_iter_values(table.iter().map(|(_, c)| c.positive));
    let total = Int64Array::from_iter_values(table.iter().map(|(_, c)| c.total));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(regions),
        Arc::new(dates),
        Arc::new(positive),
        Arc::new(total),
    ];
    RecordBatch::try_new(schema, columns).context("building output record batch")
}

fn write_parquet(table: &CleanTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for output")?;
    writer.write(&batch).context("writing output batch")?;
    writer.close().context("closing output writer")?;
    Ok(())
}
