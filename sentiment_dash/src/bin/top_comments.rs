// sentiment_dash/src/bin/top_comments.rs
//
// Offline prep step: reduce a full labeled comment dump to the few
// highest-scored comments per day and sentiment, in the table shape the
// dashboard's comment panel reads.

use anyhow::{bail, Context, Result};
use sentiment_dash::config::DEFAULT_COMMENTS_CSV;
use sentiment_dash::prep::{self, DEFAULT_PER_GROUP};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        bail!("usage: top_comments <labeled.csv> [out.csv] [per_group]");
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_COMMENTS_CSV));
    let per_group = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("per_group must be a positive integer, got {raw:?}"))?,
        None => DEFAULT_PER_GROUP,
    };

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create output dir {:?}", dir))?;
    }

    info!(input = %input.display(), per_group, "extracting top comments");
    let stats = prep::run(&input, &output, per_group)
        .with_context(|| format!("processing {:?}", input))?;
    println!(
        "[top_comments] wrote {} of {} rows to {} ({} skipped)",
        stats.kept,
        stats.read,
        output.display(),
        stats.skipped
    );
    Ok(())
}
