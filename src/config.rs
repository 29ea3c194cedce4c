//! Task configuration
//!
//! Configurations are plain serde structs with defaults matching the
//! standard CEP analysis; a JSON file may override any subset of fields.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CepError;
use crate::selection::SelectionConfig;
use crate::stg::MAX_SCAN_DPHI;
use crate::track_cuts::TrackCuts;
use crate::CepResult;

/// Configuration of the template AOD task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MyTaskConfig {
    /// Track filter mask; a track is kept when it passed any of these filters
    pub filter_mask: u32,
}

impl Default for MyTaskConfig {
    fn default() -> Self {
        Self { filter_mask: 1 }
    }
}

/// Configuration of the CEP trigger / MC-truth study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McInfoConfig {
    pub track_cuts: TrackCuts,
    pub selection: SelectionConfig,
    /// Invariant-mass agreement below which an event counts as fully reconstructed (GeV)
    pub mass_tolerance: f64,
}

impl Default for McInfoConfig {
    fn default() -> Self {
        Self {
            track_cuts: TrackCuts::default(),
            selection: SelectionConfig::default(),
            mass_tolerance: 1e-5,
        }
    }
}

impl McInfoConfig {
    /// Run-1 data: track-type mask without the ITS refit requirement
    pub fn run1() -> Self {
        Self::default().with_run1()
    }

    /// Switch to the run-1 track type, keeping every other setting
    pub fn with_run1(mut self) -> Self {
        self.track_cuts.is_run1 = true;
        let mask = self.track_cuts.baseline_mask();
        self.selection.tt_mask = mask;
        self.selection.tt_pattern = mask;
        self
    }

    pub fn validate(&self) -> CepResult<()> {
        let (lo, hi) = self.track_cuts.eta_range;
        if lo > hi {
            return Err(CepError::InvalidParameter(format!(
                "eta range [{}, {}] is empty",
                lo, hi
            )));
        }
        if self.selection.tt_pattern & !self.selection.tt_mask != 0 {
            return Err(CepError::InvalidParameter(format!(
                "track-type pattern {:#x} has bits outside mask {:#x}",
                self.selection.tt_pattern, self.selection.tt_mask
            )));
        }
        if self.selection.min_fired_chips > self.selection.n_tracks_accept {
            return Err(CepError::InvalidParameter(format!(
                "fired-chip window [{}, {}] is empty",
                self.selection.min_fired_chips, self.selection.n_tracks_accept
            )));
        }
        if self.selection.stg.max_dphi > MAX_SCAN_DPHI {
            return Err(CepError::InvalidParameter(format!(
                "STG scan up to dphi {} exceeds the mask width (max {})",
                self.selection.stg.max_dphi, MAX_SCAN_DPHI
            )));
        }
        if self.mass_tolerance < 0.0 {
            return Err(CepError::InvalidParameter(
                "mass tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration of a whole analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub my_task: MyTaskConfig,
    pub mc_info: McInfoConfig,
}

impl AnalysisConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> CepResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| CepError::Io(format!("Failed to read config: {}", e)))?;
        let config: Self = serde_json::from_str(&content)?;
        config.mc_info.validate()?;
        log::info!("Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Defaults or the given file, optionally switched to run-1 track types
    pub fn resolve(path: Option<&Path>, run1: bool) -> CepResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if run1 {
            config.mc_info = config.mc_info.with_run1();
            log::info!("Using run-1 track-type definition");
        }
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> CepResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)
            .map_err(|e| CepError::Io(format!("Failed to write config: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_cuts::TrackStatus;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.mc_info.validate().is_ok());
        assert_eq!(config.my_task.filter_mask, 1);
        assert_eq!(config.mc_info.selection.n_tracks_accept, 2);
        assert_eq!(config.mc_info.selection.stg.max_dphi, 10);
    }

    #[test]
    fn test_run1_preset() {
        let config = McInfoConfig::run1();
        assert!(config.track_cuts.is_run1);
        assert_eq!(config.selection.tt_mask & TrackStatus::ITS_REFIT, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run1_keeps_file_settings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mc_info":{"mass_tolerance":0.01,"selection":{"n_tracks_accept":4,"stg":{"max_dphi":5}}}}"#,
        )
        .unwrap();

        let config = AnalysisConfig::resolve(Some(&path), true).unwrap();
        let mc_info = &config.mc_info;
        assert!(mc_info.track_cuts.is_run1);
        assert_eq!(mc_info.selection.tt_mask, mc_info.track_cuts.baseline_mask());
        assert_eq!(mc_info.selection.tt_pattern, mc_info.track_cuts.baseline_mask());
        assert_eq!(mc_info.selection.n_tracks_accept, 4);
        assert_eq!(mc_info.selection.stg.max_dphi, 5);
        assert_eq!(mc_info.mass_tolerance, 0.01);

        let defaults = AnalysisConfig::resolve(None, false).unwrap();
        assert_eq!(defaults, AnalysisConfig::default());
        let run1 = AnalysisConfig::resolve(None, true).unwrap();
        assert_eq!(run1.mc_info, McInfoConfig::run1());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = McInfoConfig::default();
        config.selection.tt_mask = TrackStatus::TPC_REFIT;
        assert!(config.validate().is_err());

        let mut config = McInfoConfig::default();
        config.track_cuts.eta_range = (1.0, -1.0);
        assert!(config.validate().is_err());

        let mut config = McInfoConfig::default();
        config.selection.min_fired_chips = 5;
        assert!(config.validate().is_err());

        let mut config = McInfoConfig::default();
        config.selection.stg.max_dphi = MAX_SCAN_DPHI + 1;
        assert!(config.validate().is_err());
        config.selection.stg.max_dphi = MAX_SCAN_DPHI;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"my_task":{"filter_mask":16}}"#).unwrap();

        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.my_task.filter_mask, 16);
        assert_eq!(config.mc_info, McInfoConfig::default());
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let config = AnalysisConfig {
            mc_info: McInfoConfig::run1(),
            ..AnalysisConfig::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(AnalysisConfig::from_file(&path).unwrap(), config);
    }
}
