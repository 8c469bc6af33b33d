use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::coins::display::DisplayConfig;
use crate::coins::lifecycle::{CollectionConfig, LifecycleConfig};
use crate::hardware::acquisition::AcquisitionConfig;
use crate::hardware::location::LocationConfig;
use crate::processing::fallback::FallbackConfig;
use crate::processing::heading::HeadingConfig;
use crate::processing::reconciler::ReconcilerConfig;

/// Every tunable threshold for a hunt session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntConfig {
    pub location: LocationConfig,
    pub acquisition: AcquisitionConfig,
    pub heading: HeadingConfig,
    pub reconciler: ReconcilerConfig,
    pub display: DisplayConfig,
    pub fallback: FallbackConfig,
    pub collection: CollectionConfig,
    pub lifecycle: LifecycleConfig,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Config (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid parameter {parameter}={value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("No file path set for saving configuration")]
    NoPath,
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn require_positive(parameter: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(parameter, value, "must be a positive finite number"))
    }
}

impl HuntConfig {
    /// Check every cross-field constraint; first violation wins
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("location.min_distance_m", self.location.min_distance_m)?;

        let acq = &self.acquisition;
        if acq.max_attempts == 0 {
            return Err(invalid("acquisition.max_attempts", acq.max_attempts, "must be at least 1"));
        }
        require_positive("acquisition.initial_interval_s", acq.initial_interval_s as f64)?;
        if acq.max_interval_s < acq.initial_interval_s {
            return Err(invalid(
                "acquisition.max_interval_s",
                acq.max_interval_s,
                "must not be below initial_interval_s",
            ));
        }
        if acq.backoff_factor.is_nan() || acq.backoff_factor < 1.0 {
            return Err(invalid("acquisition.backoff_factor", acq.backoff_factor, "must be >= 1"));
        }

        let alpha = self.heading.smoothing_factor;
        if !(0.0..=1.0).contains(&alpha) || alpha == 0.0 {
            return Err(invalid("heading.smoothing_factor", alpha, "must be in (0, 1]"));
        }

        let rec = &self.reconciler;
        require_positive("reconciler.movement_threshold_m", rec.movement_threshold_m)?;
        require_positive("reconciler.lock_distance_m", rec.lock_distance_m)?;
        if rec.unlock_distance_m <= rec.lock_distance_m {
            return Err(invalid(
                "reconciler.unlock_distance_m",
                rec.unlock_distance_m,
                "must exceed lock_distance_m",
            ));
        }
        if rec.smoothing_time_s.is_nan() || rec.smoothing_time_s < 0.0 {
            return Err(invalid("reconciler.smoothing_time_s", rec.smoothing_time_s, "must be >= 0"));
        }

        let disp = &self.display;
        require_positive("display.materialize_distance_m", disp.materialize_distance_m)?;
        require_positive("display.collect_distance_m", disp.collect_distance_m)?;
        require_positive("display.view_distance_m", disp.view_distance_m as f64)?;
        if disp.collect_distance_m > disp.materialize_distance_m {
            return Err(invalid(
                "display.collect_distance_m",
                disp.collect_distance_m,
                "must not exceed materialize_distance_m",
            ));
        }
        if disp.hide_hysteresis_m.is_nan() || disp.hide_hysteresis_m < 0.0 {
            return Err(invalid("display.hide_hysteresis_m", disp.hide_hysteresis_m, "must be >= 0"));
        }

        require_positive("fallback.stationary_timeout_s", self.fallback.stationary_timeout_s as f64)?;
        require_positive("fallback.stationary_epsilon_m", self.fallback.stationary_epsilon_m as f64)?;

        require_positive("collection.accuracy_ceiling_m", self.collection.accuracy_ceiling_m as f64)?;

        let life = &self.lifecycle;
        if life.max_active_coins == 0 {
            return Err(invalid("lifecycle.max_active_coins", life.max_active_coins, "must be at least 1"));
        }
        require_positive("lifecycle.spawn_radius_m", life.spawn_radius_m)?;
        if life.despawn_radius_m < life.spawn_radius_m {
            return Err(invalid(
                "lifecycle.despawn_radius_m",
                life.despawn_radius_m,
                "must not be below spawn_radius_m",
            ));
        }
        Ok(())
    }
}

/// Loads, validates and persists a [`HuntConfig`]
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: HuntConfig,
    config_file_path: Option<PathBuf>,
    is_modified: bool,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &HuntConfig {
        &self.config
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: HuntConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: HuntConfig = serde_json::from_str(&content)?;
        config.validate()?;

        self.config = config;
        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        info!(path = %path.display(), "configuration loaded");
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.config)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save to the path last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::NoPath),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    // Runtime parameter adjustment

    /// Returns the previous value
    pub fn set_find_limit(&mut self, find_limit: f64) -> Result<f64, ConfigError> {
        if !(find_limit.is_finite() && find_limit >= 0.0) {
            return Err(invalid("collection.find_limit", find_limit, "must be a non-negative number"));
        }
        let old = std::mem::replace(&mut self.config.collection.find_limit, find_limit);
        self.is_modified = true;
        Ok(old)
    }

    pub fn find_limit(&self) -> f64 {
        self.config.collection.find_limit
    }

    /// Returns the previous value
    pub fn set_accuracy_ceiling(&mut self, ceiling_m: f32) -> Result<f32, ConfigError> {
        require_positive("collection.accuracy_ceiling_m", ceiling_m as f64)?;
        let old = std::mem::replace(&mut self.config.collection.accuracy_ceiling_m, ceiling_m);
        self.is_modified = true;
        Ok(old)
    }

    pub fn accuracy_ceiling(&self) -> f32 {
        self.config.collection.accuracy_ceiling_m
    }

    /// Set lock and unlock distances together; returns the previous pair
    pub fn set_lock_distances(&mut self, lock_m: f64, unlock_m: f64) -> Result<(f64, f64), ConfigError> {
        require_positive("reconciler.lock_distance_m", lock_m)?;
        if unlock_m.is_nan() || unlock_m <= lock_m {
            return Err(invalid("reconciler.unlock_distance_m", unlock_m, "must exceed lock_distance_m"));
        }
        let rec = &mut self.config.reconciler;
        let old = (rec.lock_distance_m, rec.unlock_distance_m);
        rec.lock_distance_m = lock_m;
        rec.unlock_distance_m = unlock_m;
        self.is_modified = true;
        Ok(old)
    }

    pub fn lock_distances(&self) -> (f64, f64) {
        (self.config.reconciler.lock_distance_m, self.config.reconciler.unlock_distance_m)
    }

    /// Returns the previous value
    pub fn set_movement_threshold(&mut self, threshold_m: f64) -> Result<f64, ConfigError> {
        require_positive("reconciler.movement_threshold_m", threshold_m)?;
        let old = std::mem::replace(&mut self.config.reconciler.movement_threshold_m, threshold_m);
        self.is_modified = true;
        Ok(old)
    }

    pub fn movement_threshold(&self) -> f64 {
        self.config.reconciler.movement_threshold_m
    }

    /// Returns the previous value
    pub fn set_max_active_coins(&mut self, max: usize) -> Result<usize, ConfigError> {
        if max == 0 {
            return Err(invalid("lifecycle.max_active_coins", max, "must be at least 1"));
        }
        let old = std::mem::replace(&mut self.config.lifecycle.max_active_coins, max);
        self.is_modified = true;
        Ok(old)
    }

    pub fn max_active_coins(&self) -> usize {
        self.config.lifecycle.max_active_coins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = HuntConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconciler.lock_distance_m, 8.0);
        assert_eq!(config.reconciler.unlock_distance_m, 15.0);
        assert_eq!(config.display.collect_distance_m, 5.0);
        assert_eq!(config.collection.accuracy_ceiling_m, 25.0);
        assert_eq!(config.lifecycle.max_active_coins, 20);
    }

    #[test]
    fn test_unlock_must_exceed_lock() {
        let mut config = HuntConfig::default();
        config.reconciler.unlock_distance_m = 8.0;
        match config.validate() {
            Err(ConfigError::InvalidParameter { parameter, .. }) => {
                assert_eq!(parameter, "reconciler.unlock_distance_m")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_collect_range_within_materialize_range() {
        let mut config = HuntConfig::default();
        config.display.collect_distance_m = 25.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hunt.json");

        let mut manager = ConfigManager::new();
        manager.set_find_limit(10.0).unwrap();
        manager.set_lock_distances(6.0, 20.0).unwrap();
        assert!(manager.is_modified());
        manager.save_to_file(&path).unwrap();
        assert!(!manager.is_modified());

        let loaded = ConfigManager::from_file(&path).unwrap();
        assert_eq!(loaded.find_limit(), 10.0);
        assert_eq!(loaded.lock_distances(), (6.0, 20.0));
        assert!(!loaded.is_modified());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "collection": { "accuracy_ceiling_m": 15.0, "find_limit": 3.0 } }"#).unwrap();

        let manager = ConfigManager::from_file(&path).unwrap();
        assert_eq!(manager.accuracy_ceiling(), 15.0);
        assert_eq!(manager.movement_threshold(), 3.0);
    }

    #[test]
    fn test_partial_nested_section_takes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested.json");
        fs::write(&path, r#"{ "reconciler": { "lock_distance_m": 6 }, "fallback": { "stationary_timeout_s": 5.0 } }"#)
            .unwrap();

        let manager = ConfigManager::from_file(&path).unwrap();
        assert_eq!(manager.lock_distances(), (6.0, 15.0));
        assert_eq!(manager.movement_threshold(), 3.0);
        assert_eq!(manager.config().fallback.stationary_timeout_s, 5.0);
        assert_eq!(manager.config().fallback.min_session_time_s, 2.0);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "lifecycle": { "max_active_coins": 0, "spawn_radius_m": 200.0, "despawn_radius_m": 250.0 } }"#)
            .unwrap();
        assert!(matches!(ConfigManager::from_file(&path), Err(ConfigError::InvalidParameter { .. })));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(ConfigManager::from_file(&path), Err(ConfigError::Serialization(_))));

        assert!(matches!(
            ConfigManager::from_file(dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_setters_reject_bad_values() {
        let mut manager = ConfigManager::new();
        assert!(manager.set_find_limit(-1.0).is_err());
        assert!(manager.set_lock_distances(10.0, 9.0).is_err());
        assert!(manager.set_max_active_coins(0).is_err());
        assert!(!manager.is_modified());

        assert_eq!(manager.set_movement_threshold(4.0).unwrap(), 3.0);
        assert!(manager.is_modified());
        assert!(matches!(manager.save(), Err(ConfigError::NoPath)));
    }
}
