//! Viewer configuration loaded from `batikwalk.toml` with env overrides.
//!
//! Every field has a default, so an empty or missing file runs the stock
//! walkthrough. Lookup order for the file: explicit path (first CLI
//! argument), then `BATIKWALK_CONFIG`, then `batikwalk.toml` in the working
//! directory.
//!
//! ```
//! use batikwalk::{GroundPolicy, ViewerConfig};
//!
//! let cfg = ViewerConfig::from_toml_str(r#"
//!     [locomotion]
//!     move_speed = 120.0
//!     ground_policy = "none"
//! "#).unwrap();
//!
//! assert_eq!(cfg.locomotion.move_speed, 120.0);
//! assert_eq!(cfg.locomotion.ground_policy, GroundPolicy::None);
//! assert_eq!(cfg.interaction.interaction_distance, 20.0);
//! ```

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

use crate::canting::CantingConfig;
use crate::classify::ClassificationRules;
use crate::interaction::InteractionConfig;
use crate::locomotion::{GroundPolicy, LocomotionConfig};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "batikwalk.toml";

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Rumah Batik".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// GLB model to walk through.
    pub path: PathBuf,
    /// Initial eye position.
    pub spawn: [f32; 3],
    /// Initial pitch in radians, negative looks down.
    pub spawn_pitch: f32,
    /// Initial yaw in radians.
    pub spawn_yaw: f32,
    /// TTF font for the HUD.
    pub font: PathBuf,
    /// Background colour (sRGB).
    pub clear_color: [f32; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scene.glb"),
            spawn: [-23.427, 19.0, 49.81],
            spawn_pitch: -0.3,
            spawn_yaw: 0.0,
            font: PathBuf::from("assets/font.ttf"),
            clear_color: [0.8, 0.8, 0.8],
        }
    }
}

impl SceneConfig {
    pub fn spawn_position(&self) -> Vec3 {
        Vec3::from(self.spawn)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    /// Radians per pixel of mouse movement.
    pub sensitivity: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            fov: 75.0,
            near: 0.1,
            far: 2000.0,
        }
    }
}

/// Everything the viewer can be tuned with.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub scene: SceneConfig,
    pub locomotion: LocomotionConfig,
    pub interaction: InteractionConfig,
    pub look: LookConfig,
    pub classification: ClassificationRules,
    pub canting: CantingConfig,
}

impl ViewerConfig {
    /// Parse from TOML text. Missing sections and fields keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut cfg: ViewerConfig = toml::from_str(text)?;
        cfg.classification = cfg.classification.normalized();
        Ok(cfg)
    }

    /// Read a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the config file, load it and apply env overrides.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os("BATIKWALK_CONFIG").map(PathBuf::from);
        let named = explicit.map(Path::to_path_buf).or(from_env);

        let mut cfg = match &named {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    log::info!("Loading config from {}", path.display());
                    Self::from_file(path)?
                } else {
                    log::info!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// Env overrides for quick tuning. Unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BATIKWALK_SCENE") {
            self.scene.path = PathBuf::from(path);
        }
        if let Some(v) = lookup("BATIKWALK_MOVE_SPEED") {
            match v.parse() {
                Ok(speed) => self.locomotion.move_speed = speed,
                Err(_) => log::warn!("Ignoring BATIKWALK_MOVE_SPEED={}", v),
            }
        }
        if let Some(v) = lookup("BATIKWALK_GROUND_POLICY") {
            match v.parse::<GroundPolicy>() {
                Ok(policy) => self.locomotion.ground_policy = policy,
                Err(err) => log::warn!("Ignoring BATIKWALK_GROUND_POLICY: {}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = ViewerConfig::from_toml_str("").unwrap();

        assert_eq!(cfg.scene.spawn, [-23.427, 19.0, 49.81]);
        assert_eq!(cfg.scene.spawn_pitch, -0.3);
        assert_eq!(cfg.locomotion.player_radius, 1.5);
        assert_eq!(cfg.locomotion.eye_height, 13.0);
        assert_eq!(cfg.locomotion.ground_policy, GroundPolicy::StrictGroundOnly);
        assert_eq!(cfg.canting.canvas_size, 600);
        assert_eq!(cfg.classification.special_object_name, "Object_3_4");
    }

    #[test]
    fn sections_override_selected_fields() {
        let cfg = ViewerConfig::from_toml_str(
            r#"
            [window]
            title = "Test"

            [classification]
            ground_keywords = ["FLOOR"]

            [[canting.motifs]]
            name = "Parang"
            path = "assets/parang.png"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.window.title, "Test");
        assert_eq!(cfg.window.width, 1280);
        assert_eq!(cfg.classification.ground_keywords, vec!["floor".to_string()]);
        assert_eq!(cfg.classification.interactable_keyword, "batik");
        assert_eq!(cfg.canting.motifs.len(), 1);
        assert_eq!(cfg.canting.motifs[0].name, "Parang");
        assert_eq!(cfg.canting.brush_radius, 60.0);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let result = ViewerConfig::from_toml_str("[locomotion]\nmove_speed = \"fast\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ViewerConfig::from_file(Path::new("no/such/batikwalk.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let mut cfg = ViewerConfig::default();
        cfg.apply_overrides(|key| match key {
            "BATIKWALK_SCENE" => Some("other.glb".to_string()),
            "BATIKWALK_MOVE_SPEED" => Some("fast".to_string()),
            "BATIKWALK_GROUND_POLICY" => Some("none".to_string()),
            _ => None,
        });

        assert_eq!(cfg.scene.path, PathBuf::from("other.glb"));
        assert_eq!(cfg.locomotion.move_speed, 160.0);
        assert_eq!(cfg.locomotion.ground_policy, GroundPolicy::None);
    }
}
