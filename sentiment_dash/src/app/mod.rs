pub mod event;
pub mod reducer;
pub mod render;
pub mod state;

pub use event::*;
pub use state::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::warn;

use crate::config::{DashConfig, Persistence};
use crate::data::Dataset;
use crate::error::Result;

pub type LoadReceiver = mpsc::Receiver<Result<Arc<Dataset>>>;

pub struct DashApp {
    pub state: DashState,
    interaction: render::Interaction,
    loader: Option<LoadReceiver>,
    config: DashConfig,
    persistence: Option<Persistence>,
    // owns the loader task; dropped with the app
    _runtime: Runtime,
}

impl DashApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        runtime: Runtime,
        loader: LoadReceiver,
        config: DashConfig,
        persistence: Option<Persistence>,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let mut state = DashState::default();
        state.shift_range_days = config.shift_range();
        state.shift_days = config.clamped_shift();

        Self {
            state,
            interaction: render::Interaction::default(),
            loader: Some(loader),
            config,
            persistence,
            _runtime: runtime,
        }
    }

    pub fn handle_event(&mut self, ev: AppEvent) -> bool {
        reducer::reduce(&mut self.state, ev)
    }

    /// Non-blocking check for the startup load.
    fn poll_loader(&mut self) -> bool {
        let Some(rx) = self.loader.as_mut() else {
            return false;
        };
        let ev = match rx.try_recv() {
            Ok(Ok(dataset)) => AppEvent::DatasetLoaded { dataset },
            Ok(Err(err)) => AppEvent::LoadFailed {
                message: err.to_string(),
            },
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => AppEvent::LoadFailed {
                message: "loader exited without a result".to_string(),
            },
        };
        self.loader = None;
        self.handle_event(ev)
    }

    fn snapshot_config(&mut self, ctx: &egui::Context) {
        let size = ctx.screen_rect().size();
        self.config.shift_days = self.state.shift_days;
        self.config.window_width_px = size.x;
        self.config.window_height_px = size.y;
    }
}

impl eframe::App for DashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut changed = self.poll_loader();
        if self.state.loading {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        let events = render::render(ctx, &self.state, &mut self.interaction);
        for ev in events {
            changed |= self.handle_event(AppEvent::Ui(ev));
        }
        if changed {
            ctx.request_repaint();
        }

        self.snapshot_config(ctx);
        if let Some(p) = self.persistence.as_mut() {
            p.autosave(&self.config, Instant::now());
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(p) = self.persistence.as_mut() {
            if let Err(err) = p.save_now(&self.config) {
                warn!(?err, "config save on exit failed");
            }
        }
    }
}
