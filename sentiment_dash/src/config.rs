// sentiment_dash/src/config.rs

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use chrono::Utc;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::chart::aligner::DEFAULT_SHIFT_RANGE_DAYS;

/// Bump when you change config schema.
const CONFIG_VERSION: u32 = 1;

pub const DEFAULT_MARKET_CSV: &str = "dataset/final_dataset_for_vis.csv";
pub const DEFAULT_COMMENTS_CSV: &str = "dataset/top_comments.csv";
pub const ENV_MARKET: &str = "SENTIMENT_DASH_MARKET";
pub const ENV_COMMENTS: &str = "SENTIMENT_DASH_COMMENTS";

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub version: u32,

    // data sources; None falls through to env / defaults
    pub market_csv: Option<PathBuf>,
    pub comments_csv: Option<PathBuf>,

    // aligner slider
    pub shift_days: i32,
    pub shift_range_days: i32,

    // window geometry
    pub window_width_px: f32,
    pub window_height_px: f32,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            market_csv: None,
            comments_csv: None,
            shift_days: 0,
            shift_range_days: DEFAULT_SHIFT_RANGE_DAYS,
            window_width_px: 1280.0,
            window_height_px: 900.0,
        }
    }
}

impl DashConfig {
    /// Slider bound, never below one day.
    pub fn shift_range(&self) -> i32 {
        self.shift_range_days.max(1)
    }

    pub fn clamped_shift(&self) -> i32 {
        let r = self.shift_range();
        self.shift_days.clamp(-r, r)
    }
}

/// Where the two tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub market: PathBuf,
    pub comments: PathBuf,
}

impl DataPaths {
    /// Positional args first, then env, then config, then defaults.
    pub fn resolve<I, F>(args: I, env: F, cfg: &DashConfig) -> Self
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut args = args.into_iter().filter(|a| !a.trim().is_empty());
        let arg_market = args.next().map(PathBuf::from);
        let arg_comments = args.next().map(PathBuf::from);

        let from_env = |key: &str| env(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let market = arg_market
            .or_else(|| from_env(ENV_MARKET))
            .or_else(|| cfg.market_csv.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MARKET_CSV));
        let comments = arg_comments
            .or_else(|| from_env(ENV_COMMENTS))
            .or_else(|| cfg.comments_csv.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COMMENTS_CSV));

        Self { market, comments }
    }
}

pub struct Persistence {
    path: PathBuf,
    last_saved_json: String,
    last_attempt: Option<Instant>,
}

impl Persistence {
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(default_config_path()?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            last_saved_json: String::new(),
            last_attempt: None,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// Missing file gives defaults; an unreadable one is archived first.
    pub fn load(&mut self) -> DashConfig {
        if !self.path.exists() {
            return DashConfig::default();
        }
        match self.read_file() {
            Ok(mut cfg) => {
                // simple migration hook
                if cfg.version == 0 {
                    cfg.version = CONFIG_VERSION;
                }
                if let Ok(json) = serde_json::to_string_pretty(&cfg) {
                    self.last_saved_json = json;
                }
                cfg
            }
            Err(err) => {
                let archived = self.archive_path(&Utc::now().format("%Y%m%dT%H%M%S").to_string());
                match fs::rename(&self.path, &archived) {
                    Ok(()) => warn!(?archived, ?err, "config unreadable; moved aside"),
                    Err(rename_err) => warn!(?err, %rename_err, "config unreadable; could not move it"),
                }
                DashConfig::default()
            }
        }
    }

    /// Save if content changed (prevents hammering disk)
    pub fn save_now(&mut self, cfg: &DashConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(cfg)?;
        if self.last_saved_json == json {
            return Ok(());
        }

        let parent = self.path.parent().context("config path has no parent")?;
        fs::create_dir_all(parent).with_context(|| format!("create config dir {:?}", parent))?;

        if self.path.exists() {
            let backup = self.backup_path();
            if let Err(err) = fs::copy(&self.path, &backup) {
                warn!(?backup, %err, "config backup failed");
            }
        }

        self.replace_file(json.as_bytes())?;
        debug!(path = ?self.path, "config saved");
        self.last_saved_json = json;
        Ok(())
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("json.bak")
    }

    /// Where an unreadable config is moved, tagged with `stamp`.
    pub fn archive_path(&self, stamp: &str) -> PathBuf {
        self.path.with_extension(format!("corrupt-{stamp}.json"))
    }

    fn staging_path(&self) -> Result<PathBuf> {
        let name = self
            .path
            .file_name()
            .context("config path has no file name")?
            .to_string_lossy();
        Ok(self.path.with_file_name(format!(".{name}.tmp")))
    }

    fn read_file(&self) -> Result<DashConfig> {
        let text = fs::read_to_string(&self.path).with_context(|| format!("read {:?}", self.path))?;
        serde_json::from_str(&text).with_context(|| format!("parse {:?}", self.path))
    }

    /// Write next to the target, then rename over it.
    fn replace_file(&self, bytes: &[u8]) -> Result<()> {
        let staging = self.staging_path()?;
        let mut f = fs::File::create(&staging).with_context(|| format!("create {:?}", staging))?;
        f.write_all(bytes).with_context(|| format!("write {:?}", staging))?;
        if let Err(err) = f.sync_all() {
            debug!(%err, "config fsync skipped");
        }
        drop(f);
        fs::rename(&staging, &self.path)
            .with_context(|| format!("rename {:?} -> {:?}", staging, self.path))
    }

    /// Called every frame; writes at most once per [`AUTOSAVE_INTERVAL`].
    pub fn autosave(&mut self, cfg: &DashConfig, now: Instant) {
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < AUTOSAVE_INTERVAL {
                return;
            }
        }
        self.last_attempt = Some(now);
        if let Err(err) = self.save_now(cfg) {
            warn!(?err, "config autosave failed");
        }
    }
}

fn default_config_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "sentiment", "sentiment_dash")
        .context("ProjectDirs::from returned None")?;
    Ok(proj.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_when_nothing_given() {
        let paths = DataPaths::resolve(Vec::<String>::new(), no_env, &DashConfig::default());
        assert_eq!(paths.market, PathBuf::from(DEFAULT_MARKET_CSV));
        assert_eq!(paths.comments, PathBuf::from(DEFAULT_COMMENTS_CSV));
    }

    #[test]
    fn args_beat_env_beat_config() {
        let cfg = DashConfig {
            market_csv: Some("cfg_market.csv".into()),
            comments_csv: Some("cfg_comments.csv".into()),
            ..DashConfig::default()
        };
        let env: HashMap<&str, &str> = [(ENV_MARKET, "env_market.csv")].into_iter().collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let paths = DataPaths::resolve(Vec::<String>::new(), lookup, &cfg);
        assert_eq!(paths.market, PathBuf::from("env_market.csv"));
        assert_eq!(paths.comments, PathBuf::from("cfg_comments.csv"));

        let paths = DataPaths::resolve(vec!["arg.csv".to_string()], lookup, &cfg);
        assert_eq!(paths.market, PathBuf::from("arg.csv"));
        assert_eq!(paths.comments, PathBuf::from("cfg_comments.csv"));
    }

    #[test]
    fn shift_is_clamped_to_range() {
        let cfg = DashConfig {
            shift_days: 25,
            shift_range_days: 0,
            ..DashConfig::default()
        };
        assert_eq!(cfg.shift_range(), 1);
        assert_eq!(cfg.clamped_shift(), 1);
        assert_eq!(DashConfig::default().shift_range(), 10);
    }

    #[test]
    fn save_then_load_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut p = Persistence::with_path(path.clone());

        assert_eq!(p.load(), DashConfig::default());

        let mut cfg = DashConfig {
            shift_days: 4,
            ..DashConfig::default()
        };
        p.save_now(&cfg).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.bak").exists());

        cfg.shift_days = -3;
        p.save_now(&cfg).unwrap();
        assert!(p.backup_path().exists());
        assert!(!dir.path().join("nested").join(".config.json.tmp").exists());

        let mut fresh = Persistence::with_path(path);
        assert_eq!(fresh.load().shift_days, -3);
    }

    #[test]
    fn unchanged_config_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut p = Persistence::with_path(path.clone());
        let cfg = DashConfig::default();
        p.save_now(&cfg).unwrap();
        fs::remove_file(&path).unwrap();
        p.save_now(&cfg).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_archived() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();

        let mut p = Persistence::with_path(path.clone());
        assert_eq!(p.load(), DashConfig::default());
        assert!(!path.exists());
        let archived = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains("corrupt"));
        assert!(archived);
    }

    #[test]
    fn side_files_sit_next_to_config() {
        let p = Persistence::with_path(PathBuf::from("/cfg/dash/config.json"));
        assert_eq!(p.backup_path(), PathBuf::from("/cfg/dash/config.json.bak"));
        assert_eq!(
            p.archive_path("20240101T000000"),
            PathBuf::from("/cfg/dash/config.corrupt-20240101T000000.json")
        );
        assert_eq!(
            p.staging_path().unwrap(),
            PathBuf::from("/cfg/dash/.config.json.tmp")
        );
        assert!(Persistence::with_path(PathBuf::from("/")).staging_path().is_err());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"shift_days": 7}"#).unwrap();
        let cfg = Persistence::with_path(path).load();
        assert_eq!(cfg.shift_days, 7);
        assert_eq!(cfg.shift_range_days, DEFAULT_SHIFT_RANGE_DAYS);
        assert_eq!(cfg.version, CONFIG_VERSION);
    }

    #[test]
    fn autosave_is_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut p = Persistence::with_path(path.clone());
        let t0 = Instant::now();
        p.autosave(&DashConfig::default(), t0);
        assert!(path.exists());

        let changed = DashConfig {
            shift_days: 2,
            ..DashConfig::default()
        };
        p.autosave(&changed, t0 + Duration::from_millis(100));
        assert_eq!(Persistence::with_path(path.clone()).load().shift_days, 0);
        p.autosave(&changed, t0 + AUTOSAVE_INTERVAL);
        assert_eq!(Persistence::with_path(path).load().shift_days, 2);
    }
}
