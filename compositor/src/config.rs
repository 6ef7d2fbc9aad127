//! Compositor configuration.
//!
//! Settings come from an optional TOML file; command-line flags in
//! `main.rs` override individual fields afterwards. Every section is
//! `#[serde(default)]` so a partial file only changes what it names.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub physics: PhysicsConfig,
    pub keyboard: KeyboardConfig,
    pub keybindings: KeybindingsConfig,
    pub startup: StartupConfig,
}

/// Rigid-body simulation parameters. Lengths are logical pixels.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Gravity in px/s². Positive y points down the screen.
    pub gravity: [f32; 2],
    pub pixels_per_meter: f32,
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    /// Thickness of the floor and walls, extending outward from the output edge.
    pub wall_thickness: f32,
    /// Vertical spawn position of new windows relative to the top of the first output.
    pub spawn_height: f32,
    /// New windows start with a random rotation in `[0, max_initial_rotation)` radians.
    pub max_initial_rotation: f32,
    pub tick_hz: u32,
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 1500.0],
            pixels_per_meter: 100.0,
            friction: 0.7,
            restitution: 0.1,
            density: 1.0,
            wall_thickness: 64.0,
            spawn_height: -400.0,
            max_initial_rotation: 1.0,
            tick_hz: 60,
            max_substeps: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KeyboardConfig {
    pub repeat_delay_ms: i32,
    pub repeat_rate: i32,
    pub layout: Option<String>,
    pub variant: Option<String>,
    pub options: Option<String>,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            repeat_delay_ms: 600,
            repeat_rate: 25,
            layout: None,
            variant: None,
            options: None,
        }
    }
}

/// Compositor keybindings, written as `Mod+Mod+Keysym`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KeybindingsConfig {
    pub quit: String,
    pub focus_latest: String,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            quit: "Alt+Escape".to_string(),
            focus_latest: "Alt+F1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StartupConfig {
    /// Shell command launched once the Wayland socket is listening.
    pub command: Option<String>,
}

impl Config {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/gravwm/config.toml`, falling back to `~/.config`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("gravwm").join("config.toml"))
    }

    /// Load an explicitly requested file, or the default file if it exists.
    ///
    /// A missing explicit path is an error; a missing default file is not.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        if !(p.pixels_per_meter.is_finite() && p.pixels_per_meter > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.pixels_per_meter must be positive, got {}",
                p.pixels_per_meter
            )));
        }
        if !p.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::Invalid("physics.gravity must be finite".into()));
        }
        if p.tick_hz == 0 {
            return Err(ConfigError::Invalid("physics.tick_hz must be at least 1".into()));
        }
        if p.max_substeps == 0 {
            return Err(ConfigError::Invalid(
                "physics.max_substeps must be at least 1".into(),
            ));
        }
        if !(p.wall_thickness.is_finite() && p.wall_thickness > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.wall_thickness must be positive, got {}",
                p.wall_thickness
            )));
        }
        if !(p.density.is_finite() && p.density > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.density must be positive, got {}",
                p.density
            )));
        }
        for (name, value) in [("friction", p.friction), ("restitution", p.restitution)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "physics.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(p.spawn_height.is_finite() && p.max_initial_rotation.is_finite()) {
            return Err(ConfigError::Invalid(
                "physics.spawn_height and max_initial_rotation must be finite".into(),
            ));
        }
        if p.max_initial_rotation < 0.0 {
            return Err(ConfigError::Invalid(
                "physics.max_initial_rotation must not be negative".into(),
            ));
        }
        if self.keyboard.repeat_rate < 0 || self.keyboard.repeat_delay_ms < 0 {
            return Err(ConfigError::Invalid("keyboard repeat values must not be negative".into()));
        }
        Ok(())
    }
}

/// Parse a "WxH" resolution string. Returns (width, height) or None.
pub fn parse_resolution(s: &str) -> Option<(i32, i32)> {
    let (w, h) = s.split_once('x')?;
    let w = w.trim().parse::<i32>().ok()?;
    let h = h.trim().parse::<i32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Parse a "X,Y" gravity override.
pub fn parse_gravity(s: &str) -> Option<[f32; 2]> {
    let (x, y) = s.split_once(',')?;
    let x = x.trim().parse::<f32>().ok()?;
    let y = y.trim().parse::<f32>().ok()?;
    (x.is_finite() && y.is_finite()).then_some([x, y])
}
