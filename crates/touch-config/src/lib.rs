//! Configuration for touchmap.
//!
//! - `lib.rs`: the TOML model and loader
//! - [`layout`]: widget entries and their conversion into engine specs

pub mod layout;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use touch_engine::{EngineSettings, FrameSize, InputSettings, KeyInjectMode};

pub use layout::WidgetConfig;

/// Default config directory under `$XDG_CONFIG_HOME`.
const CONFIG_DIR: &str = "touchmap";
/// Default config file name.
const CONFIG_FILE: &str = "config.toml";

/// Resolve the default config file path.
///
/// Returns `$XDG_CONFIG_HOME/touchmap/config.toml` or
/// `~/.config/touchmap/config.toml`.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Load the configuration from a TOML file.
///
/// If `path` is `None`, reads from the default location.
/// Returns the default configuration if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    if !path.exists() {
        tracing::debug!(?path, "Config file not found, using defaults");
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;

    let config = parse(&contents)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;

    tracing::info!(?path, widgets = config.widgets.len(), "Configuration loaded");
    Ok(config)
}

/// Parse configuration text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML for [`Config`].
pub fn parse(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("invalid configuration")
}

/// Configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the control channel listens on.
    pub bind: SocketAddr,

    /// Host frame that widget and cursor coordinates refer to.
    pub frame: SizeConfig,

    /// Device resolution. When set, coordinates are rescaled from the
    /// frame to the device before they are sent.
    pub device: Option<SizeConfig>,

    /// Frame size the widget layout was authored for. When set and
    /// different from `frame`, widget geometry is rescaled on load.
    pub layout_frame: Option<SizeConfig>,

    /// Fallback keyboard and mouse forwarding.
    pub input: InputConfig,

    /// Widgets to place at start-up.
    pub widgets: Vec<WidgetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 10721)),
            frame: SizeConfig::default(),
            device: None,
            layout_frame: None,
            input: InputConfig::default(),
            widgets: Vec::new(),
        }
    }
}

impl Config {
    /// Settings for the mapping engine.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            frame: self.frame.into(),
            input: self.input.settings(),
        }
    }

    /// Device resolution to scale outgoing coordinates to, if configured.
    #[must_use]
    pub fn device_frame(&self) -> Option<FrameSize> {
        self.device.map(FrameSize::from)
    }

    /// Horizontal and vertical factors from the layout frame to the frame.
    #[must_use]
    pub fn layout_scale(&self) -> (f64, f64) {
        match self.layout_frame {
            Some(from) if from.width > 0 && from.height > 0 => (
                f64::from(self.frame.width) / f64::from(from.width),
                f64::from(self.frame.height) / f64::from(from.height),
            ),
            _ => (1.0, 1.0),
        }
    }
}

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    pub width: u16,
    pub height: u16,
}

impl Default for SizeConfig {
    fn default() -> Self {
        let frame = FrameSize::default();
        Self {
            width: frame.width,
            height: frame.height,
        }
    }
}

impl From<SizeConfig> for FrameSize {
    fn from(size: SizeConfig) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Fallback keyboard and mouse forwarding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// "mixed", "text" or "raw".
    pub inject_mode: String,

    /// Invert scroll direction.
    pub natural_scroll: bool,

    /// Forward cursor motion without a held button as hover.
    pub mouse_hover: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        let defaults = InputSettings::default();
        Self {
            inject_mode: defaults.inject_mode.to_string(),
            natural_scroll: defaults.natural_scroll,
            mouse_hover: defaults.mouse_hover,
        }
    }
}

impl InputConfig {
    #[must_use]
    pub fn settings(&self) -> InputSettings {
        let inject_mode = self.inject_mode.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}, using {}", KeyInjectMode::default());
            KeyInjectMode::default()
        });
        InputSettings {
            inject_mode,
            natural_scroll: self.natural_scroll,
            mouse_hover: self.mouse_hover,
        }
    }
}
