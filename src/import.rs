use std::io::Write;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::day::{to_date, to_day, Day};
use crate::models::Entry;
use crate::series::{is_valid_weight, TimeSeries};
use crate::store::BlockStore;

const DELIMITERS: [u8; 3] = [b',', b' ', b'\t'];
const MISSING_MARKERS: [&str; 3] = ["-", "_", ""];

#[derive(Debug, Default, PartialEq)]
pub struct ParsedImport {
    pub entries: Vec<Entry>,
    pub cleared: Vec<Day>,
    pub rejected: usize,
}

impl ParsedImport {
    /// Values and clears as one batch of writes.
    pub fn writes(&self) -> Vec<(Day, Option<f64>)> {
        self.entries
            .iter()
            .map(|entry| (entry.day, Some(entry.weight)))
            .chain(self.cleared.iter().map(|&day| (day, None)))
            .collect()
    }
}

fn reader(data: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes())
}

/// The first delimiter that splits the first row into more than one field.
fn sniff_delimiter(data: &str) -> Option<u8> {
    DELIMITERS.into_iter().find(|&delimiter| {
        let mut rows = reader(data, delimiter);
        let first = rows.records().next();
        matches!(first, Some(Ok(record)) if record.len() > 1)
    })
}

fn parse_date(field: &str) -> Option<NaiveDate> {
    let format = if field.contains('/') { "%m/%d/%Y" } else { "%Y-%m-%d" };
    NaiveDate::parse_from_str(field, format).ok()
}

/// Parse `date,weight` rows. Dates are `MM/DD/YYYY` or `YYYY-MM-DD`; a weight
/// of `-`, `_` or nothing clears the day. Bad rows are logged and skipped.
pub fn parse_entries(data: &str) -> anyhow::Result<ParsedImport> {
    let delimiter = sniff_delimiter(data).with_context(|| {
        let first_line = data.lines().next().unwrap_or_default();
        format!("unrecognized csv format: '{first_line}'")
    })?;

    let mut parsed = ParsedImport::default();
    for record in reader(data, delimiter).records() {
        let record = record.context("failed to read csv row")?;
        let (Some(date_field), Some(weight_field)) = (record.get(0), record.get(1)) else {
            warn!(row = ?record, "invalid row in imported data");
            parsed.rejected += 1;
            continue;
        };

        let Some(date) = parse_date(date_field) else {
            warn!(date = date_field, "invalid date entry");
            parsed.rejected += 1;
            continue;
        };
        let day = to_day(date);

        if MISSING_MARKERS.contains(&weight_field) {
            parsed.cleared.push(day);
            continue;
        }

        match weight_field.parse::<f64>() {
            Ok(weight) if is_valid_weight(weight) => {
                parsed.entries.push(Entry::new(day, weight));
            }
            _ => {
                warn!(weight = weight_field, "invalid weight entry");
                parsed.rejected += 1;
            }
        }
    }

    Ok(parsed)
}

/// Import a CSV file through a single batch, so each touched block is written
/// once and a weight beats a clear marker for the same day.
pub async fn import_csv<S: BlockStore>(
    series: &TimeSeries<'_, S>,
    path: &Path,
) -> anyhow::Result<ParsedImport> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = parse_entries(&data)?;
    let writes = parsed.writes();
    anyhow::ensure!(!writes.is_empty(), "no usable rows in {}", path.display());

    let blocks = series.batch_write(writes).await?;

    info!(
        imported = parsed.entries.len(),
        cleared = parsed.cleared.len(),
        rejected = parsed.rejected,
        blocks,
        "csv import finished"
    );
    Ok(parsed)
}

#[derive(Serialize)]
struct ExportRow {
    date: NaiveDate,
    weight: f64,
}

pub fn write_csv<W: Write>(
    entries: impl Iterator<Item = Entry>,
    out: W,
) -> anyhow::Result<usize> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    let mut written = 0usize;
    for entry in entries {
        writer.serialize(ExportRow {
            date: to_date(entry.day)?,
            weight: entry.weight,
        })?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}
