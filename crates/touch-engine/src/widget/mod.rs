//! On-screen touch widgets driven by key mappings.
//!
//! - `single_click.rs`: tap and hold at the widget centre
//! - `repeated_click.rs`: rapid taps while held or after release
//! - `dpad.rs`: virtual joystick steered by four direction keys
//! - `aim.rs`: camera drag from relative mouse motion
//! - `fire.rs`: tap that only works while aiming
//! - `macros.rs`: scripted key and touch sequences
//! - `skill.rs`: skill joystick aimed by the cursor, and its cancel button
//! - `walk.rs`: click-to-move joystick

mod aim;
mod context;
mod dpad;
mod fire;
mod glide;
mod macros;
mod repeated_click;
mod single_click;
mod skill;
mod walk;

use std::fmt;
use std::str::FromStr;

use touch_keys::{Key, KeyCombination};

use crate::bus::{Event, EventKind};
use crate::geometry::Rect;
use crate::timer::TimerId;

pub use aim::{Aim, AimMode, AimSettings};
pub use context::WidgetContext;
pub(crate) use context::Runtime;
pub use dpad::{DirectionalPad, DpadKeys, DpadSettings, MovementMode};
pub use fire::Fire;
pub use macros::{Macro, MacroCommand, MacroPoint, MacroScript};
pub use repeated_click::{OperatingMethod, RepeatedClick, RepeatedClickSettings};
pub use single_click::SingleClick;
pub use skill::{CancelCasting, CastTiming, SkillCasting, SkillSettings, SkillState};
pub use walk::{RightClickToWalk, WalkSettings};

/// Stable identity of an attached widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    SingleClick,
    RepeatedClick,
    DirectionalPad,
    Aim,
    Fire,
    Macro,
    SkillCasting,
    CancelCasting,
    RightClickToWalk,
}

impl WidgetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleClick => "single_click",
            Self::RepeatedClick => "repeated_click",
            Self::DirectionalPad => "directional_pad",
            Self::Aim => "aim",
            Self::Fire => "fire",
            Self::Macro => "macro",
            Self::SkillCasting => "skill_casting",
            Self::CancelCasting => "cancel_casting",
            Self::RightClickToWalk => "right_click_to_walk",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting or kind name that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct UnknownName {
    pub what: &'static str,
    pub value: String,
}

impl UnknownName {
    pub(crate) fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_owned(),
        }
    }
}

impl FromStr for WidgetKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_click" => Ok(Self::SingleClick),
            "repeated_click" => Ok(Self::RepeatedClick),
            "directional_pad" | "dpad" => Ok(Self::DirectionalPad),
            "aim" => Ok(Self::Aim),
            "fire" => Ok(Self::Fire),
            "macro" => Ok(Self::Macro),
            "skill_casting" => Ok(Self::SkillCasting),
            "cancel_casting" => Ok(Self::CancelCasting),
            "right_click_to_walk" => Ok(Self::RightClickToWalk),
            other => Err(UnknownName::new("widget kind", other)),
        }
    }
}

/// A key combination a widget listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub combination: KeyCombination,
    pub reentrant: bool,
}

impl Binding {
    #[must_use]
    pub fn new(combination: KeyCombination, reentrant: bool) -> Self {
        Self {
            combination,
            reentrant,
        }
    }
}

/// Behaviour shared by every widget.
///
/// The engine owns widgets and calls back into them; a widget never holds
/// references to engine state outside a [`WidgetContext`].
pub trait Widget {
    fn kind(&self) -> WidgetKind;

    fn rect(&self) -> Rect;

    /// Key combinations to subscribe when the widget is attached.
    fn bindings(&self) -> Vec<Binding>;

    /// Bus events delivered to [`on_event`](Self::on_event).
    fn event_interests(&self) -> &'static [EventKind] {
        &[]
    }

    /// A bound combination became active. Returns whether the widget acted.
    fn on_trigger(&mut self, combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool;

    /// A bound combination was released. Returns whether the widget acted.
    fn on_release(&mut self, combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool;

    fn on_timer(&mut self, _timer: TimerId, _ctx: &mut WidgetContext<'_>) {}

    fn on_event(&mut self, _event: &Event, _ctx: &mut WidgetContext<'_>) {}

    /// The widget is being destroyed; lift any finger still down.
    fn on_detach(&mut self, _ctx: &mut WidgetContext<'_>) {}
}

/// Declarative description of a widget, used by layouts and
/// `CreateWidget` events.
#[derive(Debug, Clone)]
pub enum WidgetSpec {
    SingleClick {
        rect: Rect,
        key: KeyCombination,
    },
    RepeatedClick {
        rect: Rect,
        key: KeyCombination,
        settings: RepeatedClickSettings,
    },
    DirectionalPad {
        rect: Rect,
        keys: DpadKeys,
        settings: DpadSettings,
    },
    Aim {
        rect: Rect,
        key: KeyCombination,
        settings: AimSettings,
    },
    Fire {
        rect: Rect,
        key: KeyCombination,
    },
    Macro {
        rect: Rect,
        key: KeyCombination,
        script: MacroScript,
    },
    SkillCasting {
        rect: Rect,
        key: KeyCombination,
        settings: SkillSettings,
    },
    CancelCasting {
        rect: Rect,
        key: KeyCombination,
    },
    RightClickToWalk {
        rect: Rect,
        key: KeyCombination,
        settings: WalkSettings,
    },
}

impl WidgetSpec {
    #[must_use]
    pub fn kind(&self) -> WidgetKind {
        match self {
            Self::SingleClick { .. } => WidgetKind::SingleClick,
            Self::RepeatedClick { .. } => WidgetKind::RepeatedClick,
            Self::DirectionalPad { .. } => WidgetKind::DirectionalPad,
            Self::Aim { .. } => WidgetKind::Aim,
            Self::Fire { .. } => WidgetKind::Fire,
            Self::Macro { .. } => WidgetKind::Macro,
            Self::SkillCasting { .. } => WidgetKind::SkillCasting,
            Self::CancelCasting { .. } => WidgetKind::CancelCasting,
            Self::RightClickToWalk { .. } => WidgetKind::RightClickToWalk,
        }
    }

    #[must_use]
    pub fn build(self) -> Box<dyn Widget> {
        match self {
            Self::SingleClick { rect, key } => Box::new(SingleClick::new(rect, key)),
            Self::RepeatedClick {
                rect,
                key,
                settings,
            } => Box::new(RepeatedClick::new(rect, key, settings)),
            Self::DirectionalPad {
                rect,
                keys,
                settings,
            } => Box::new(DirectionalPad::new(rect, keys, settings)),
            Self::Aim {
                rect,
                key,
                settings,
            } => Box::new(Aim::new(rect, key, settings)),
            Self::Fire { rect, key } => Box::new(Fire::new(rect, key)),
            Self::Macro { rect, key, script } => Box::new(Macro::new(rect, key, script)),
            Self::SkillCasting {
                rect,
                key,
                settings,
            } => Box::new(SkillCasting::new(rect, key, settings)),
            Self::CancelCasting { rect, key } => Box::new(CancelCasting::new(rect, key)),
            Self::RightClickToWalk {
                rect,
                key,
                settings,
            } => Box::new(RightClickToWalk::new(rect, key, settings)),
        }
    }
}

fn single_binding(key: &KeyCombination, reentrant: bool) -> Vec<Binding> {
    if key.is_empty() {
        Vec::new()
    } else {
        vec![Binding::new(key.clone(), reentrant)]
    }
}

fn key_binding(key: &Key) -> Binding {
    Binding::new(KeyCombination::single(key.clone()), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            WidgetKind::SingleClick,
            WidgetKind::RepeatedClick,
            WidgetKind::DirectionalPad,
            WidgetKind::Aim,
            WidgetKind::Fire,
            WidgetKind::Macro,
            WidgetKind::SkillCasting,
            WidgetKind::CancelCasting,
            WidgetKind::RightClickToWalk,
        ] {
            assert_eq!(kind.as_str().parse::<WidgetKind>(), Ok(kind));
        }
        assert_eq!("dpad".parse::<WidgetKind>(), Ok(WidgetKind::DirectionalPad));
        assert!("skill".parse::<WidgetKind>().is_err());
    }
}
