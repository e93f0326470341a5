//! Persisted configuration. Grounded on `commands/config.rs`'s
//! `save_league_path`/`load_league_path`/`load_config`
//! (`serde_json`-under-`app_data_dir`), generalized away from
//! `tauri::AppHandle` to an explicit `user_data_dir`, and narrowed to the
//! keys `spec.md` §6 names for the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";
const HISTORIC_FILE: &str = "historic.json";

fn default_injection_threshold() -> f64 {
    0.5
}

fn default_monitor_auto_resume_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Explicit game directory, if the embedder or a prior discovery set one.
    #[serde(default)]
    pub league_path: Option<PathBuf>,

    /// Cooldown between injections, seconds, clamped >= 0. Default 0.5.
    #[serde(default = "default_injection_threshold")]
    pub injection_threshold: f64,

    /// Wall-clock max suspension, seconds, clamped to [1, 180]. Default 60.
    #[serde(default = "default_monitor_auto_resume_timeout")]
    pub monitor_auto_resume_timeout: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            league_path: None,
            injection_threshold: default_injection_threshold(),
            monitor_auto_resume_timeout: default_monitor_auto_resume_timeout(),
        }
    }
}

impl EngineConfig {
    pub fn injection_threshold_duration(&self) -> Duration {
        Duration::from_secs_f64(self.injection_threshold.max(0.0))
    }

    pub fn monitor_auto_resume_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.monitor_auto_resume_timeout.clamp(1, 180))
    }

    pub fn load(user_data_dir: &Path) -> Self {
        let file = user_data_dir.join(CONFIG_FILE);
        match fs::read_to_string(&file) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to parse config.json, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, user_data_dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(user_data_dir)?;
        let file = user_data_dir.join(CONFIG_FILE);
        let data = serde_json::to_string_pretty(self)?;
        fs::write(file, data)
    }

    /// Persist a newly discovered game directory. Never called with an
    /// invalid path (callers validate first, per §4.1 step 3).
    pub fn persist_discovered_game_dir(&mut self, user_data_dir: &Path, dir: PathBuf) {
        self.league_path = Some(dir);
        if let Err(err) = self.save(user_data_dir) {
            tracing::warn!(error = %err, "failed to persist discovered game directory");
        }
    }
}

/// Last injected skin id per champion, for replay by higher layers
/// (`spec.md` §6, "Persisted state"). Present in the distillation's prose
/// but not modeled as a type there; this is the minimal model that satisfies
/// it: a flat map, read/written the same way `EngineConfig` is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricStore {
    #[serde(flatten)]
    last_skin_by_champion: HashMap<u32, u32>,
}

impl HistoricStore {
    pub fn load(user_data_dir: &Path) -> Self {
        let file = user_data_dir.join(HISTORIC_FILE);
        fs::read_to_string(&file)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, user_data_dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(user_data_dir)?;
        let file = user_data_dir.join(HISTORIC_FILE);
        let data = serde_json::to_string_pretty(self)?;
        fs::write(file, data)
    }

    pub fn last_skin_for(&self, champion_id: u32) -> Option<u32> {
        self.last_skin_by_champion.get(&champion_id).copied()
    }

    pub fn record(&mut self, champion_id: u32, skin_id: u32) {
        self.last_skin_by_champion.insert(champion_id, skin_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.injection_threshold, 0.5);
        assert_eq!(cfg.monitor_auto_resume_timeout_duration().as_secs(), 60);
    }

    #[test]
    fn test_auto_resume_timeout_clamped() {
        let mut cfg = EngineConfig::default();
        cfg.monitor_auto_resume_timeout = 0;
        assert_eq!(cfg.monitor_auto_resume_timeout_duration().as_secs(), 1);
        cfg.monitor_auto_resume_timeout = 10_000;
        assert_eq!(cfg.monitor_auto_resume_timeout_duration().as_secs(), 180);
    }

    #[test]
    fn test_historic_store_roundtrip() {
        let mut store = HistoricStore::default();
        store.record(99, 99002);
        assert_eq!(store.last_skin_for(99), Some(99002));
        assert_eq!(store.last_skin_for(1), None);
    }
}
