//! Per-day derived metrics over the market table, plus the summaries the
//! offline risk views are scaled by: sentiment balance, fear intensity,
//! volatility colour caps and the volatility-threshold sweep.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{format_date_key, parse_date_key};
use crate::error::{DashError, Result};

/// Keeps the balance finite on days with no comments.
pub const NET_EPSILON: f64 = 1e-9;
/// Upper colour cap of the scatter matrix.
pub const MATRIX_COLOR_CAP_Q: f64 = 0.90;
/// Colour band of the dark fingerprint view.
pub const FINGERPRINT_BAND_Q: (f64, f64) = (0.05, 0.95);
pub const SWEEP_STEPS: usize = 30;
/// The sweep stops this far above the calmest day.
pub const SWEEP_FLOOR_OFFSET: f64 = 0.1;

#[derive(Debug, Deserialize)]
struct MetricSourceRow {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    fear_ratio: Option<String>,
    #[serde(default, rename = "count_Hype")]
    count_hype: Option<String>,
    #[serde(default, rename = "count_Fear")]
    count_fear: Option<String>,
    #[serde(default)]
    total_comments: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    volatility: Option<String>,
}

/// Blank or non-numeric cells are missing (NaN), not zero.
fn cell(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// `(hype - fear) / total`: -1 is all fear, +1 all hype.
pub fn sentiment_net(hype: f64, fear: f64, total_comments: f64) -> f64 {
    (hype - fear) / (total_comments + NET_EPSILON)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayMetrics {
    #[serde(serialize_with = "date_key")]
    pub date: NaiveDate,
    pub sentiment_net: f64,
    pub total_comments: f64,
    pub volume: f64,
    pub fear_ratio: f64,
    #[serde(rename = "count_Hype")]
    pub hype: f64,
    #[serde(rename = "count_Fear")]
    pub fear: f64,
    pub volatility: f64,
}

fn date_key<S: serde::Serializer>(d: &NaiveDate, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_date_key(*d))
}

impl DayMetrics {
    /// Every risk dimension is present.
    pub fn is_complete(&self) -> bool {
        [
            self.fear_ratio,
            self.hype,
            self.total_comments,
            self.volume,
            self.volatility,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Ascending by date; rows with a bad date are dropped.
pub fn parse_metrics<R: Read>(input: R) -> Result<Vec<DayMetrics>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let mut out = Vec::new();
    for (line, row) in reader.deserialize::<MetricSourceRow>().enumerate() {
        let row = row?;
        let Some(date) = row.date.as_deref().and_then(|d| parse_date_key(d).ok()) else {
            debug!(line = line + 2, raw = ?row.date, "dropping metric row with bad date");
            continue;
        };
        let hype = cell(row.count_hype.as_deref());
        let fear = cell(row.count_fear.as_deref());
        let total_comments = cell(row.total_comments.as_deref());
        out.push(DayMetrics {
            date,
            sentiment_net: sentiment_net(hype, fear, total_comments),
            total_comments,
            volume: cell(row.volume.as_deref()),
            fear_ratio: cell(row.fear_ratio.as_deref()),
            hype,
            fear,
            volatility: cell(row.volatility.as_deref()),
        });
    }
    out.sort_by_key(|m| m.date);
    Ok(out)
}

/// Linear-interpolated quantile of the finite values.
pub fn quantile(values: impl IntoIterator<Item = f64>, q: f64) -> Option<f64> {
    let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(v[lo] + (v[hi] - v[lo]) * (pos - lo as f64))
}

fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FearPeak {
    pub date: NaiveDate,
    pub fear_ratio: f64,
    pub total_comments: f64,
}

/// Colour legend stops of the spiral view and its reddest day.
#[derive(Debug, Clone, PartialEq)]
pub struct FearSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub peak: FearPeak,
}

pub fn fear_summary(rows: &[DayMetrics]) -> Option<FearSummary> {
    let finite: Vec<&DayMetrics> = rows.iter().filter(|m| m.fear_ratio.is_finite()).collect();
    // first maximum wins
    let peak = finite
        .iter()
        .copied()
        .reduce(|best, m| if m.fear_ratio > best.fear_ratio { m } else { best })?;
    let (min, max) = extent(finite.iter().map(|m| m.fear_ratio))?;
    let mean = finite.iter().map(|m| m.fear_ratio).sum::<f64>() / finite.len() as f64;
    Some(FearSummary {
        min,
        mean,
        max,
        peak: FearPeak {
            date: peak.date,
            fear_ratio: peak.fear_ratio,
            total_comments: peak.total_comments,
        },
    })
}

/// Value range of one parallel axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub label: &'static str,
    pub lo: f64,
    pub hi: f64,
}

pub const RISK_AXES: [&str; 5] = [
    "Sentiment (Fear)",
    "Hype Volume",
    "Social Activity",
    "Trading Volume",
    "Market Risk (Vol)",
];

fn dims(m: &DayMetrics) -> [f64; 5] {
    [m.fear_ratio, m.hype, m.total_comments, m.volume, m.volatility]
}

/// Complete rows only, calmest first so the riskiest draw on top.
pub fn risk_rows(rows: &[DayMetrics]) -> Vec<DayMetrics> {
    let mut out: Vec<DayMetrics> = rows.iter().filter(|m| m.is_complete()).cloned().collect();
    out.sort_by(|a, b| a.volatility.total_cmp(&b.volatility));
    out
}

/// One slider step of the threshold sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepStep {
    pub threshold: f64,
    pub kept: usize,
    pub axes: [AxisRange; 5],
}

/// Thresholds from the stormiest day down to just above the calmest.
pub fn sweep_thresholds(rows: &[DayMetrics], steps: usize) -> Vec<f64> {
    let Some((lo, hi)) = extent(risk_rows(rows).iter().map(|m| m.volatility)) else {
        return Vec::new();
    };
    let end = lo + SWEEP_FLOOR_OFFSET;
    match steps {
        0 => Vec::new(),
        1 => vec![hi],
        n => (0..n)
            .map(|i| hi + (end - hi) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Axis ranges after hiding days above `threshold`. Lower bounds stay at
/// the global minimum; a collapsed range is widened by one unit (0.01 for
/// volatility). `None` when no day survives.
pub fn sweep_step(rows: &[DayMetrics], threshold: f64) -> Option<SweepStep> {
    let complete = risk_rows(rows);
    let mins: Vec<f64> = (0..5)
        .map(|k| extent(complete.iter().map(|m| dims(m)[k])).map_or(0.0, |e| e.0))
        .collect();
    let kept: Vec<&DayMetrics> = complete.iter().filter(|m| m.volatility <= threshold).collect();
    if kept.is_empty() {
        return None;
    }

    let axes = std::array::from_fn(|k| {
        let lo = mins[k];
        let max = kept.iter().map(|m| dims(m)[k]).fold(f64::NEG_INFINITY, f64::max);
        let hi = match k {
            0 => max,
            4 if max <= lo => lo + 0.01,
            _ if max <= lo => lo + 1.0,
            _ => max,
        };
        AxisRange { label: RISK_AXES[k], lo, hi }
    });
    Some(SweepStep {
        threshold,
        kept: kept.len(),
        axes,
    })
}

pub fn sweep(rows: &[DayMetrics], steps: usize) -> Vec<SweepStep> {
    sweep_thresholds(rows, steps)
        .into_iter()
        .filter_map(|t| sweep_step(rows, t))
        .collect()
}

pub fn write_metrics<W: Write>(writer: W, rows: &[DayMetrics]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| DashError::io("<csv output>", e))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub days: usize,
    pub complete: usize,
    pub fear: Option<FearSummary>,
    pub matrix_color_cap: Option<f64>,
    pub fingerprint_band: Option<(f64, f64)>,
    pub sweep: Vec<SweepStep>,
}

pub fn report(rows: &[DayMetrics]) -> MetricsReport {
    let complete = risk_rows(rows);
    let vol = || complete.iter().map(|m| m.volatility);
    MetricsReport {
        days: rows.len(),
        complete: complete.len(),
        fear: fear_summary(rows),
        matrix_color_cap: quantile(vol(), MATRIX_COLOR_CAP_Q),
        fingerprint_band: quantile(vol(), FINGERPRINT_BAND_Q.0)
            .zip(quantile(vol(), FINGERPRINT_BAND_Q.1)),
        sweep: sweep(rows, SWEEP_STEPS),
    }
}

pub fn run(input: &Path, output: &Path) -> Result<MetricsReport> {
    let file = File::open(input).map_err(|e| DashError::io(input, e))?;
    let rows = parse_metrics(file)?;
    let out = File::create(output).map_err(|e| DashError::io(output, e))?;
    write_metrics(out, &rows)?;

    let report = report(&rows);
    info!(
        days = report.days,
        complete = report.complete,
        output = %output.display(),
        "daily metrics written"
    );
    Ok(report)
}
