use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::record::{parse_date_key, Comment, DailyRecord, Dataset};
use crate::error::{DashError, Result};

#[derive(Debug, Deserialize)]
struct MarketRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    close: Option<String>,
    #[serde(default)]
    high: Option<String>,
    #[serde(default)]
    low: Option<String>,
    #[serde(default)]
    volatility: Option<String>,
    #[serde(default)]
    fear_ratio: Option<String>,
    #[serde(default, rename = "count_Hype")]
    count_hype: Option<String>,
    #[serde(default, rename = "count_Fear")]
    count_fear: Option<String>,
    #[serde(default, rename = "count_Anger")]
    count_anger: Option<String>,
    #[serde(default, rename = "count_Noise")]
    count_noise: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    sentiment_label: Option<String>,
    #[serde(default)]
    score: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

/// Unary-plus coercion: blank is 0, numeric text parses, anything else is NaN.
pub fn coerce_number(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

/// Post counts are non-negative integers; NaN and negatives collapse to 0.
pub fn coerce_count(raw: Option<&str>) -> u32 {
    let v = coerce_number(raw);
    if v.is_finite() && v > 0.0 {
        v.trunc().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut b = csv::ReaderBuilder::new();
    b.has_headers(true).flexible(true).trim(csv::Trim::Headers);
    b
}

/// Parse the market table into ascending day records.
///
/// Rows with an unparseable `date` are dropped. The open of each kept
/// record is the previous kept record's close; the first record opens at
/// its own low.
pub fn parse_market<R: Read>(input: R) -> Result<Vec<DailyRecord>> {
    let mut reader = reader_builder().from_reader(input);
    let mut out: Vec<DailyRecord> = Vec::new();
    let mut dropped = 0usize;

    for (line, row) in reader.deserialize::<MarketRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line = line + 2, %err, "skipping malformed market row");
                continue;
            }
        };

        let Some(date) = row.date.as_deref().and_then(|d| parse_date_key(d).ok()) else {
            dropped += 1;
            debug!(line = line + 2, raw = ?row.date, "dropping market row with bad date");
            continue;
        };

        let close = coerce_number(row.close.as_deref());
        let low = coerce_number(row.low.as_deref());
        let open = out.last().map(|prev| prev.close).unwrap_or(low);

        out.push(DailyRecord {
            date,
            open,
            high: coerce_number(row.high.as_deref()),
            low,
            close,
            volatility: coerce_number(row.volatility.as_deref()),
            fear_ratio: coerce_number(row.fear_ratio.as_deref()),
            hype: coerce_count(row.count_hype.as_deref()),
            fear: coerce_count(row.count_fear.as_deref()),
            anger: coerce_count(row.count_anger.as_deref()),
            noise: coerce_count(row.count_noise.as_deref()),
        });
    }

    if dropped > 0 {
        debug!(dropped, "market rows dropped for unparseable dates");
    }
    Ok(out)
}

pub fn parse_comments<R: Read>(input: R) -> Result<Vec<Comment>> {
    let mut reader = reader_builder().from_reader(input);
    let mut out = Vec::new();

    for (line, row) in reader.deserialize::<CommentRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(line = line + 2, %err, "skipping malformed comment row");
                continue;
            }
        };
        let score = coerce_number(row.score.as_deref());
        out.push(Comment {
            date: row.date.unwrap_or_default(),
            sentiment_label: row.sentiment_label.unwrap_or_default(),
            score: if score.is_finite() { score.trunc() as i64 } else { 0 },
            body: row.body.unwrap_or_default(),
        });
    }
    Ok(out)
}

/// Read both tables concurrently, then parse off the async threads.
///
/// A missing or broken comments table yields an empty comment list; only a
/// failure on the market table is an error.
pub async fn load_dataset(market: PathBuf, comments: Option<PathBuf>) -> Result<Dataset> {
    let comments_read = async {
        match &comments {
            Some(path) => Some(tokio::fs::read(path).await),
            None => None,
        }
    };
    let (market_bytes, comment_bytes) = tokio::join!(tokio::fs::read(&market), comments_read);

    let market_bytes = market_bytes.map_err(|e| DashError::io(&market, e))?;
    let records = tokio::task::spawn_blocking(move || parse_market(market_bytes.as_slice())).await??;

    let comments = match comment_bytes {
        Some(Ok(bytes)) => {
            match tokio::task::spawn_blocking(move || parse_comments(bytes.as_slice())).await? {
                Ok(list) => list,
                Err(err) => {
                    warn!(%err, "comments table unreadable; continuing without comments");
                    Vec::new()
                }
            }
        }
        Some(Err(err)) => {
            info!(path = ?comments, %err, "no comments table; continuing without comments");
            Vec::new()
        }
        None => Vec::new(),
    };

    info!(
        records = records.len(),
        comments = comments.len(),
        "dataset loaded"
    );
    Ok(Dataset { records, comments })
}

/// Kick off [`load_dataset`] on `rt`; the UI polls the returned receiver.
pub fn spawn_load(
    rt: &Runtime,
    market: PathBuf,
    comments: Option<PathBuf>,
) -> mpsc::Receiver<Result<Arc<Dataset>>> {
    let (tx, rx) = mpsc::channel(1);
    rt.spawn(async move {
        let res = load_dataset(market, comments).await.map(Arc::new);
        let _ = tx.send(res).await;
    });
    rx
}
