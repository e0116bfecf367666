/// Board configuration
///
/// A single JSON file, `<config_dir>/button-board/config.json`. Every field
/// has a default, so a missing file or a partial file is fine.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;
use crate::error::{BoardError, Result};
use crate::layout::anchor::RowReference;
use crate::schedule::WindowCalculator;

pub const APP_DIR: &str = "button-board";
pub const CONFIG_FILE: &str = "config.json";
/// The board's calendar, UTC+09:00
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 540;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Offset of the local calendar all windows are computed in
    pub utc_offset_minutes: i32,
    /// Debug shift applied to the wall clock
    pub time_offset_ms: i64,
    pub container_height: f64,
    pub frame_width: f64,
    pub reference_top: f64,
    pub reference_height: Option<f64>,
    pub database_path: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    /// Uploads wider than this are scaled down
    pub upload_max_width: u32,
    /// Fixed RNG seed for reproducible layouts
    pub seed: Option<u64>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            time_offset_ms: 0,
            container_height: 900.0,
            frame_width: 390.0,
            reference_top: 10.0,
            reference_height: None,
            database_path: None,
            uploads_dir: None,
            upload_max_width: 800,
            seed: None,
        }
    }
}

impl BoardConfig {
    /// `<config_dir>/button-board/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| BoardError::Config("could not determine config directory".into()))?;
        path.push(APP_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Read `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn local_zone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            BoardError::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn calendar(&self) -> Result<WindowCalculator<FixedOffset>> {
        Ok(WindowCalculator::new(self.local_zone()?))
    }

    pub fn clock(&self) -> Clock {
        Clock::new(self.time_offset_ms)
    }

    pub fn row_reference(&self) -> RowReference {
        RowReference {
            top: self.reference_top,
            height: self.reference_height,
        }
    }

    /// Configured database file, or `<data_dir>/button-board/board.db`
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("board.db")),
        }
    }

    /// Configured uploads directory, or `<data_dir>/button-board/uploads`
    pub fn uploads_dir(&self) -> Result<PathBuf> {
        match &self.uploads_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("uploads")),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| BoardError::Config("could not determine data directory".into()))?;
    path.push(APP_DIR);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BoardConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, BoardConfig::default());
        assert_eq!(config.local_zone().unwrap().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"utc_offset_minutes": -300, "seed": 7}"#).unwrap();
        let config = BoardConfig::load_from(&path).unwrap();
        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.container_height, 900.0);
        assert_eq!(config.upload_max_width, 800);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = BoardConfig {
            time_offset_ms: 3_600_000,
            reference_height: Some(44.0),
            ..BoardConfig::default()
        };
        config.save_to(&path).unwrap();
        let loaded = BoardConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.clock().offset_ms(), 3_600_000);
        assert_eq!(loaded.row_reference().height, Some(44.0));
    }

    #[test]
    fn test_bad_offset_is_a_config_error() {
        let config = BoardConfig {
            utc_offset_minutes: 60 * 30,
            ..BoardConfig::default()
        };
        assert!(matches!(config.local_zone(), Err(BoardError::Config(_))));
    }

    #[test]
    fn test_huge_hand_edited_offset_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"time_offset_ms": 9223372036854775807}"#).unwrap();
        let clock = BoardConfig::load_from(&path).unwrap().clock();
        assert_eq!(clock.offset_ms(), crate::clock::MAX_OFFSET_MS);
        assert!(clock.now() > chrono::Utc::now());
    }
}
