// sentiment_dash/src/main.rs

use anyhow::{anyhow, Context, Result};
use sentiment_dash::app::DashApp;
use sentiment_dash::config::{DashConfig, DataPaths, Persistence};
use sentiment_dash::data::spawn_load;
use tracing::{info, warn};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut persistence = match Persistence::new() {
        Ok(p) => Some(p),
        Err(err) => {
            warn!(?err, "no config directory; settings will not persist");
            None
        }
    };
    let config = persistence
        .as_mut()
        .map(|p| p.load())
        .unwrap_or_else(DashConfig::default);

    let paths = DataPaths::resolve(std::env::args().skip(1), |k| std::env::var(k).ok(), &config);
    info!(market = ?paths.market, comments = ?paths.comments, "starting dashboard");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let loader = spawn_load(&runtime, paths.market, Some(paths.comments));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width_px.max(640.0), config.window_height_px.max(480.0)])
            .with_title("GME Sentiment Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "sentiment_dash",
        options,
        Box::new(move |cc| Box::new(DashApp::new(cc, runtime, loader, config, persistence))),
    )
    .map_err(|e| anyhow!("eframe: {e}"))
}
