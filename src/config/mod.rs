use crate::assets::{is_usable_scale, ScaleRule, ScaleTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scale for '{target}' must be positive and finite, got {scale}")]
    InvalidScale { target: String, scale: f32 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Tunables for placement and manipulation. Every field has a default, so a
/// partial JSON file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory model paths are resolved against by the file loader.
    pub asset_root: String,
    pub default_scale: f32,
    pub scale_rules: Vec<ScaleRule>,
    /// Auto-rotation speed in degrees per second.
    pub auto_rotate_speed_deg: f32,
    /// Per-frame slerp step toward the target orientation.
    pub smoothing_factor: f32,
    pub upright_pitch_deg: f32,
    pub upright_roll_deg: f32,
    /// Frame time assumed for the first frame of a session, in seconds.
    pub first_frame_dt: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: "./asset".to_string(),
            default_scale: 0.1,
            scale_rules: ScaleTable::default_rules(),
            auto_rotate_speed_deg: 10.0,
            smoothing_factor: 0.1,
            upright_pitch_deg: 0.0,
            upright_roll_deg: 0.0,
            first_frame_dt: 1.0 / 60.0,
        }
    }
}

impl Config {
    /// Reject scales that would collapse a placed object.
    pub fn validate(&self) -> Result<()> {
        if !is_usable_scale(self.default_scale) {
            return Err(ConfigError::InvalidScale {
                target: "default_scale".to_string(),
                scale: self.default_scale,
            });
        }
        if let Some(rule) = self.scale_rules.iter().find(|r| !is_usable_scale(r.scale)) {
            return Err(ConfigError::InvalidScale {
                target: rule.contains.clone(),
                scale: rule.scale,
            });
        }
        Ok(())
    }

    pub fn scale_table(&self) -> ScaleTable {
        ScaleTable::new(self.default_scale, self.scale_rules.clone())
    }

    pub fn auto_rotate_speed(&self) -> f32 {
        self.auto_rotate_speed_deg.to_radians()
    }

    pub fn upright_pitch(&self) -> f32 {
        self.upright_pitch_deg.to_radians()
    }

    pub fn upright_roll(&self) -> f32 {
        self.upright_roll_deg.to_radians()
    }
}

pub fn save_to_file(config: &Config, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<Config> {
    let json = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"auto_rotate_speed_deg": 180.0, "asset_root": "models"}"#)
                .unwrap();
        assert_eq!(config.asset_root, "models");
        assert!((config.auto_rotate_speed() - std::f32::consts::PI).abs() < 1e-6);
        assert_eq!(config.smoothing_factor, 0.1);
        assert_eq!(config.scale_rules, ScaleTable::default_rules());
    }

    #[test]
    fn custom_scale_rules_feed_the_table() {
        let config: Config = serde_json::from_str(
            r#"{"default_scale": 1.0, "scale_rules": [{"contains": "tiny", "scale": 0.01}]}"#,
        )
        .unwrap();
        let table = config.scale_table();
        assert_eq!(table.scale_for("tiny_cup.glb"), 0.01);
        assert_eq!(table.scale_for("Margherita.glb"), 1.0);
    }

    #[test]
    fn save_then_load_file() {
        let path = std::env::temp_dir().join(format!("arplace-config-{}.json", std::process::id()));
        let mut config = Config::default();
        config.smoothing_factor = 0.25;
        save_to_file(&config, &path).unwrap();
        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn zero_scale_is_rejected_on_load() {
        let path = std::env::temp_dir().join(format!("arplace-scale-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"scale_rules": [{"contains": "cup", "scale": 0.0}]}"#).unwrap();
        let result = load_from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidScale { target, .. }) if target == "cup"
        ));

        let config = Config {
            default_scale: -1.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidScale { .. })));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("arplace-config-does-not-exist.json");
        assert!(matches!(load_from_file(&path), Err(ConfigError::Io(_))));
    }
}
