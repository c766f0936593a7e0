use chrono::{Datelike, NaiveDate};

use crate::error::{DashError, Result};

pub const DAY_MS: f64 = 86_400_000.0;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One trading day: OHLC, volatility, and the sentiment post counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volatility: f64,
    pub fear_ratio: f64,
    pub hype: u32,
    pub fear: u32,
    pub anger: u32,
    pub noise: u32,
}

impl DailyRecord {
    /// Timestamp of the day start in ms (UTC, no DST).
    pub fn ms(&self) -> f64 {
        date_to_ms(self.date)
    }

    pub fn total_posts(&self) -> u32 {
        self.hype + self.fear + self.anger + self.noise
    }

    /// Sum of the streamgraph layers; noise is not stacked.
    pub fn stream_total(&self) -> u32 {
        self.hype + self.fear + self.anger
    }

    pub fn price_change(&self) -> f64 {
        self.close - self.open
    }

    pub fn date_key(&self) -> String {
        format_date_key(self.date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Raw date text as written in the source; matched by string equality.
    pub date: String,
    pub sentiment_label: String,
    pub score: i64,
    pub body: String,
}

/// Both datasets, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<DailyRecord>,
    pub comments: Vec<Comment>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `[first, last]` record timestamps in ms.
    pub fn extent_ms(&self) -> Option<(f64, f64)> {
        extent_ms(&self.records)
    }
}

pub fn extent_ms(records: &[DailyRecord]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for r in records {
        let t = r.ms();
        lo = lo.min(t);
        hi = hi.max(t);
    }
    (lo <= hi).then_some((lo, hi))
}

pub fn date_to_ms(date: NaiveDate) -> f64 {
    (date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE) as f64 * DAY_MS
}

/// Calendar day containing `ms`.
pub fn ms_to_date(ms: f64) -> Option<NaiveDate> {
    if !ms.is_finite() {
        return None;
    }
    let days = (ms / DAY_MS).floor() as i64 + UNIX_EPOCH_DAYS_FROM_CE as i64;
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(days).ok()?)
}

/// Leading blanks are skipped; anything after the day fails the parse.
pub fn parse_date_key(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim_start(), DATE_FORMAT)
        .map_err(|_| DashError::BadDate(raw.to_string()))
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Long display form, e.g. `Jan 28, 2021`.
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}
