// sentiment_dash/src/bin/sentiment_metrics.rs
//
// Offline companion to the dashboard: writes the per-day sentiment balance
// table and prints the scaling the risk views use.

use anyhow::{Context, Result};
use sentiment_dash::config::DEFAULT_MARKET_CSV;
use sentiment_dash::data::format_date_key;
use sentiment_dash::metrics;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_OUTPUT: &str = "dataset/daily_metrics.csv";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MARKET_CSV));
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create output dir {:?}", dir))?;
    }

    info!(input = %input.display(), "deriving daily metrics");
    let report = metrics::run(&input, &output).with_context(|| format!("processing {:?}", input))?;

    println!(
        "[sentiment_metrics] {} days ({} complete) -> {}",
        report.days,
        report.complete,
        output.display()
    );
    if let Some(fear) = &report.fear {
        println!(
            "  fear intensity: low {:.2} / avg {:.2} / extreme {:.2}",
            fear.min, fear.mean, fear.max
        );
        println!(
            "  reddest day {}: fear {:.2} on {} comments",
            format_date_key(fear.peak.date),
            fear.peak.fear_ratio,
            fear.peak.total_comments
        );
    }
    if let Some(cap) = report.matrix_color_cap {
        println!("  volatility colour cap (p90): {cap:.3}");
    }
    if let Some((lo, hi)) = report.fingerprint_band {
        println!("  volatility band (p5..p95): {lo:.3}..{hi:.3}");
    }
    for step in &report.sweep {
        println!(
            "  max volatility {:>5.1}: {:>4} days",
            step.threshold, step.kept
        );
    }
    Ok(())
}
