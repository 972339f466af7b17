//! Widget layout entries.
//!
//! Each `[[widgets]]` table names a widget type, its rectangle on the host
//! frame, its key binding and any type-specific options. Entries that cannot
//! be built are logged and skipped so the rest of the layout still loads.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use touch_engine::widget::{
    AimMode, AimSettings, CastTiming, DpadKeys, DpadSettings, MacroScript, MovementMode,
    OperatingMethod, RepeatedClickSettings, SkillSettings, WalkSettings,
};
use touch_engine::{Rect, WidgetKind, WidgetSpec};
use touch_keys::{KeyCombination, KeyRegistry};

/// Default directional pad keys: up, left, down, right.
const DEFAULT_DPAD_KEYS: [&str; 4] = ["W", "A", "S", "D"];

const DEFAULT_WALK_KEY: &str = "Mouse_Right";

/// One `[[widgets]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Widget type, e.g. "single_click" or "directional_pad".
    #[serde(rename = "type")]
    pub kind: String,

    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Key combination such as "Ctrl_L+A" or "Mouse_Left".
    pub key: String,

    /// Directional pad keys in up, left, down, right order.
    pub keys: Vec<String>,

    /// Repeated click operating method.
    pub method: Option<String>,

    /// Tick interval of repeated clicks and sliding joysticks.
    pub interval_ms: Option<u64>,

    /// Clicks fired after release by the click-after-release method.
    pub click_count: Option<u32>,

    /// Directional pad movement mode, aim mode or skill cast timing.
    pub mode: Option<String>,

    /// Interpolation steps of sliding joysticks.
    pub steps: Option<u32>,

    /// Skill cursor distance that reaches the widget edge.
    pub circle_radius: Option<f64>,

    /// Aim sensitivity.
    pub sensitivity: Option<f64>,

    /// Macro script.
    pub script: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            key: String::new(),
            keys: Vec::new(),
            method: None,
            interval_ms: None,
            click_count: None,
            mode: None,
            steps: None,
            circle_radius: None,
            sensitivity: None,
            script: String::new(),
        }
    }
}

impl WidgetConfig {
    /// Build the engine description of this widget.
    ///
    /// Geometry is multiplied by `scale`. Returns `None` for unknown types
    /// and malformed directional pad keys.
    pub fn to_spec(&self, registry: &mut KeyRegistry, scale: (f64, f64)) -> Option<WidgetSpec> {
        let kind: WidgetKind = match self.kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("{e}, skipping widget");
                return None;
            }
        };
        let (sx, sy) = scale;
        let rect = Rect::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy);

        let spec = match kind {
            WidgetKind::SingleClick => WidgetSpec::SingleClick {
                rect,
                key: self.combination(registry),
            },
            WidgetKind::RepeatedClick => WidgetSpec::RepeatedClick {
                rect,
                key: self.combination(registry),
                settings: self.repeated_click_settings(),
            },
            WidgetKind::DirectionalPad => WidgetSpec::DirectionalPad {
                rect,
                keys: self.dpad_keys(registry)?,
                settings: self.dpad_settings(),
            },
            WidgetKind::Aim => WidgetSpec::Aim {
                rect,
                key: self.combination(registry),
                settings: self.aim_settings(),
            },
            WidgetKind::Fire => WidgetSpec::Fire {
                rect,
                key: self.combination(registry),
            },
            WidgetKind::Macro => WidgetSpec::Macro {
                rect,
                key: self.combination(registry),
                script: MacroScript::parse(&self.script, registry),
            },
            WidgetKind::SkillCasting => WidgetSpec::SkillCasting {
                rect,
                key: self.combination(registry),
                settings: self.skill_settings(),
            },
            WidgetKind::CancelCasting => WidgetSpec::CancelCasting {
                rect,
                key: self.combination(registry),
            },
            WidgetKind::RightClickToWalk => WidgetSpec::RightClickToWalk {
                rect,
                key: self.walk_key(registry),
                settings: self.walk_settings(),
            },
        };
        Some(spec)
    }

    fn combination(&self, registry: &mut KeyRegistry) -> KeyCombination {
        KeyCombination::parse(&self.key, registry).unwrap_or_else(|| {
            tracing::warn!(kind = %self.kind, "Widget has no key binding");
            KeyCombination::default()
        })
    }

    fn repeated_click_settings(&self) -> RepeatedClickSettings {
        let defaults = RepeatedClickSettings::default();
        let method = match self.method.as_deref().map(str::parse::<OperatingMethod>) {
            Some(Ok(method)) => method,
            Some(Err(e)) => {
                tracing::warn!("{e}, using {}", defaults.method);
                defaults.method
            }
            None => defaults.method,
        };
        RepeatedClickSettings {
            method,
            interval: self.interval_ms.map_or(defaults.interval, Duration::from_millis),
            click_count: self.click_count.unwrap_or(defaults.click_count),
        }
    }

    fn dpad_keys(&self, registry: &mut KeyRegistry) -> Option<DpadKeys> {
        let names: Vec<&str> = if self.keys.is_empty() {
            DEFAULT_DPAD_KEYS.to_vec()
        } else {
            self.keys.iter().map(String::as_str).collect()
        };
        let [up, left, down, right] = names.as_slice() else {
            tracing::warn!(keys = ?self.keys, "Directional pad needs four keys, skipping widget");
            return None;
        };
        Some(DpadKeys::new(
            registry.deserialize(up),
            registry.deserialize(left),
            registry.deserialize(down),
            registry.deserialize(right),
        ))
    }

    fn dpad_settings(&self) -> DpadSettings {
        let defaults = DpadSettings::default();
        DpadSettings {
            interval: self.interval_ms.map_or(defaults.interval, Duration::from_millis),
            steps: self.steps.unwrap_or(defaults.steps),
            mode: self
                .mode
                .as_deref()
                .map_or(defaults.mode, MovementMode::parse_or_default),
        }
    }

    fn aim_settings(&self) -> AimSettings {
        let defaults = AimSettings::default();
        let mode = match self.mode.as_deref().map(str::parse::<AimMode>) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                tracing::warn!("{e}, using hold");
                AimMode::Hold
            }
            None => defaults.mode,
        };
        AimSettings {
            mode,
            sensitivity: self.sensitivity.unwrap_or(defaults.sensitivity),
        }
    }

    fn skill_settings(&self) -> SkillSettings {
        let defaults = SkillSettings::default();
        let timing = match self.mode.as_deref().map(str::parse::<CastTiming>) {
            Some(Ok(timing)) => timing,
            Some(Err(e)) => {
                tracing::warn!("{e}, using {}", defaults.timing);
                defaults.timing
            }
            None => defaults.timing,
        };
        SkillSettings {
            timing,
            circle_radius: self.circle_radius.unwrap_or(defaults.circle_radius),
            interval: self.interval_ms.map_or(defaults.interval, Duration::from_millis),
            steps: self.steps.unwrap_or(defaults.steps),
        }
    }

    fn walk_key(&self, registry: &mut KeyRegistry) -> KeyCombination {
        let name = if self.key.is_empty() {
            DEFAULT_WALK_KEY
        } else {
            &self.key
        };
        KeyCombination::parse(name, registry).unwrap_or_default()
    }

    fn walk_settings(&self) -> WalkSettings {
        let defaults = WalkSettings::default();
        WalkSettings {
            interval: self.interval_ms.map_or(defaults.interval, Duration::from_millis),
            steps: self.steps.unwrap_or(defaults.steps),
        }
    }
}

impl crate::Config {
    /// Build every widget in the layout, skipping entries that fail.
    pub fn widget_specs(&self, registry: &mut KeyRegistry) -> Vec<WidgetSpec> {
        let scale = self.layout_scale();
        self.widgets
            .iter()
            .filter_map(|w| w.to_spec(registry, scale))
            .collect()
    }
}
