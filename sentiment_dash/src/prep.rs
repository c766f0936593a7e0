//! Builds the comments table from a full labeled dump: the highest-scored
//! few comments per day and sentiment label.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::format_date_key;
use crate::error::{DashError, Result};

pub const DEFAULT_PER_GROUP: usize = 2;

#[derive(Debug, Deserialize)]
struct LabeledRow {
    body: Option<String>,
    sentiment_label: Option<String>,
    score: Option<String>,
    timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopComment {
    pub body: String,
    pub sentiment_label: String,
    /// Blank or non-numeric scores are kept as `None` and rank last.
    pub score: Option<i64>,
    pub timestamp: String,
    pub date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepStats {
    pub read: usize,
    pub skipped: usize,
    pub kept: usize,
}

/// Calendar day of a timestamp cell. Accepts RFC 3339, `YYYY-MM-DD
/// HH:MM:SS[.f]`, a bare date, or unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc().date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let secs = s.parse::<f64>().ok().filter(|v| v.is_finite())?;
    DateTime::from_timestamp(secs.floor() as i64, 0).map(|dt| dt.date_naive())
}

fn parse_score(raw: &str) -> Option<i64> {
    let s = raw.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
}

/// Rows that carry a usable timestamp; the rest are counted.
pub fn read_labeled<R: Read>(reader: R) -> Result<(Vec<TopComment>, PrepStats)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut stats = PrepStats::default();
    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize::<LabeledRow>().enumerate() {
        stats.read += 1;
        let row = result?;
        let timestamp = row.timestamp.unwrap_or_default();
        let Some(date) = parse_timestamp(&timestamp) else {
            debug!(line = line + 2, %timestamp, "skipping row without usable timestamp");
            stats.skipped += 1;
            continue;
        };
        rows.push(TopComment {
            body: row.body.unwrap_or_default(),
            sentiment_label: row.sentiment_label.unwrap_or_default(),
            score: row.score.as_deref().and_then(parse_score),
            timestamp,
            date: format_date_key(date),
        });
    }
    Ok((rows, stats))
}

/// Highest scores first (ties keep input order, missing scores last), at
/// most `per_group` per
/// `(date, sentiment_label)`.
pub fn top_comments(mut rows: Vec<TopComment>, per_group: usize) -> Vec<TopComment> {
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    rows.into_iter()
        .filter(|r| {
            let n = seen
                .entry((r.date.clone(), r.sentiment_label.clone()))
                .or_insert(0);
            *n += 1;
            *n <= per_group
        })
        .collect()
}

pub fn write_top<W: Write>(writer: W, rows: &[TopComment]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| DashError::io("<csv output>", e))?;
    Ok(())
}

pub fn run(input: &Path, output: &Path, per_group: usize) -> Result<PrepStats> {
    let file = File::open(input).map_err(|e| DashError::io(input, e))?;
    let (rows, mut stats) = read_labeled(file)?;
    let top = top_comments(rows, per_group);
    stats.kept = top.len();

    let out = File::create(output).map_err(|e| DashError::io(output, e))?;
    write_top(out, &top)?;
    info!(
        read = stats.read,
        skipped = stats.skipped,
        kept = stats.kept,
        output = %output.display(),
        "top comments written"
    );
    Ok(stats)
}
