use std::fmt;
use std::str::FromStr;

use touch_keys::KeyCombination;

use super::{single_binding, Binding, UnknownName, Widget, WidgetContext, WidgetKind};
use crate::bus::{Event, EventData, EventKind, PointerMotion};
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AimMode {
    /// Aim while the key is held.
    #[default]
    Hold,
    /// Each press flips aiming on or off.
    Toggle,
}

impl fmt::Display for AimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => f.write_str("hold"),
            Self::Toggle => f.write_str("toggle"),
        }
    }
}

impl FromStr for AimMode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hold" => Ok(Self::Hold),
            "toggle" => Ok(Self::Toggle),
            other => Err(UnknownName::new("aim mode", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AimSettings {
    pub mode: AimMode,
    /// Relative motion is scaled by `sensitivity / 50`.
    pub sensitivity: f64,
}

impl Default for AimSettings {
    fn default() -> Self {
        Self {
            mode: AimMode::Hold,
            sensitivity: 20.0,
        }
    }
}

/// Turns locked-pointer motion into a finger dragging across the aim area.
#[derive(Debug, Clone)]
pub struct Aim {
    rect: Rect,
    key: KeyCombination,
    settings: AimSettings,
    aiming: bool,
    /// Position of the finger while it is down.
    finger: Option<Point>,
}

impl Aim {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination, settings: AimSettings) -> Self {
        Self {
            rect,
            key,
            settings,
            aiming: false,
            finger: None,
        }
    }

    #[must_use]
    pub fn is_aiming(&self) -> bool {
        self.aiming
    }

    /// Start aiming. Refused when no pointer id is free.
    fn activate(&mut self, ctx: &mut WidgetContext<'_>) -> bool {
        if ctx.allocate_pointer().is_none() {
            tracing::warn!(widget = %ctx.id(), "No free pointer id for aim");
            return false;
        }
        self.aiming = true;
        ctx.emit(EventData::AimTriggered);
        tracing::debug!(widget = %ctx.id(), "Aim engaged");
        true
    }

    fn deactivate(&mut self, ctx: &mut WidgetContext<'_>) {
        self.aiming = false;
        ctx.emit(EventData::AimReleased);
        self.lift(ctx);
        ctx.release_pointer();
        tracing::debug!(widget = %ctx.id(), "Aim released");
    }

    fn lift(&mut self, ctx: &mut WidgetContext<'_>) {
        if let (Some(at), Some(pointer)) = (self.finger.take(), ctx.pointer()) {
            ctx.finger_up(pointer, at);
        }
    }

    fn drag(&mut self, dx: f64, dy: f64, ctx: &mut WidgetContext<'_>) {
        let scale = self.settings.sensitivity / 50.0;
        let (dx, dy) = (dx * scale, dy * scale);
        let frame = ctx.frame();

        if let Some(at) = self.finger {
            let next = Point::new(at.x + dx, at.y + dy);
            if !self.rect.contains(next) {
                if let Some(pointer) = ctx.pointer() {
                    ctx.finger_up(pointer, frame.clamp(next));
                }
                self.finger = None;
            }
        }

        let start = match self.finger {
            Some(at) => at,
            None => {
                let Some(pointer) = ctx.allocate_pointer() else {
                    tracing::warn!(widget = %ctx.id(), "No free pointer id for aim");
                    return;
                };
                let center = frame.clamp(self.rect.center());
                ctx.finger_down(pointer, center);
                center
            }
        };

        let Some(pointer) = ctx.pointer() else {
            return;
        };
        let next = frame.clamp(Point::new(start.x + dx, start.y + dy));
        ctx.finger_move(pointer, next);
        self.finger = Some(next);
    }
}

impl Widget for Aim {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Aim
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, false)
    }

    fn event_interests(&self) -> &'static [EventKind] {
        &[EventKind::MouseMotion]
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        match (self.settings.mode, self.aiming) {
            (AimMode::Toggle, true) => self.deactivate(ctx),
            (_, false) => return self.activate(ctx),
            (AimMode::Hold, true) => {}
        }
        true
    }

    fn on_release(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        if self.settings.mode == AimMode::Hold && self.aiming {
            self.deactivate(ctx);
        }
        true
    }

    fn on_event(&mut self, event: &Event, ctx: &mut WidgetContext<'_>) {
        if let EventData::MouseMotion(PointerMotion::Relative { dx, dy }) = event.data {
            if self.aiming {
                self.drag(dx, dy, ctx);
            }
        }
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        if self.aiming {
            self.deactivate(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use touch_keys::KeyRegistry;
    use touch_proto::{ControlMessage, MotionAction};

    use super::*;
    use crate::bus::Source;
    use crate::geometry::FrameSize;
    use crate::pointer::{PointerIdPool, PointerOwner};
    use crate::widget::Runtime;
    use crate::WidgetId;

    const ID: WidgetId = WidgetId(9);

    fn aim(mode: AimMode) -> (Aim, KeyCombination) {
        let key = KeyCombination::parse("Mouse_Right", &mut KeyRegistry::new()).unwrap();
        let settings = AimSettings {
            mode,
            sensitivity: 50.0,
        };
        (Aim::new(Rect::new(1000.0, 200.0, 400.0, 400.0), key.clone(), settings), key)
    }

    fn motion(dx: f64, dy: f64) -> Event {
        Event::new(
            Source::Handler("motion"),
            EventData::MouseMotion(PointerMotion::Relative { dx, dy }),
        )
    }

    fn drain(rt: &mut Runtime) -> Vec<String> {
        rt.outbox
            .drain(..)
            .map(|e| match e.data {
                EventData::ControlMessage(ControlMessage::InjectTouch(t)) => {
                    format!("{} {},{}", t.action, t.position.x, t.position.y)
                }
                other => format!("{:?}", other.kind()),
            })
            .collect()
    }

    #[test]
    fn hold_mode_drags_from_center() {
        let (mut aim, key) = aim(AimMode::Hold);
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());

        aim.on_event(&motion(5.0, 5.0), &mut WidgetContext::new(ID, &mut rt));
        assert!(rt.outbox.is_empty());

        aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        aim.on_event(&motion(10.0, -4.0), &mut WidgetContext::new(ID, &mut rt));
        aim.on_event(&motion(10.0, 0.0), &mut WidgetContext::new(ID, &mut rt));
        aim.on_release(&key, &mut WidgetContext::new(ID, &mut rt));

        let down = MotionAction::Down;
        let mv = MotionAction::Move;
        let up = MotionAction::Up;
        assert_eq!(
            drain(&mut rt),
            [
                "AimTriggered".to_owned(),
                format!("{down} 1200,400"),
                format!("{mv} 1210,396"),
                format!("{mv} 1220,396"),
                "AimReleased".to_owned(),
                format!("{up} 1220,396"),
            ]
        );
        assert!(!aim.is_aiming());
        assert_eq!(rt.pointers.active(), 0);
    }

    #[test]
    fn leaving_area_regrips_at_center() {
        let (mut aim, key) = aim(AimMode::Hold);
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());
        aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        aim.on_event(&motion(150.0, 0.0), &mut WidgetContext::new(ID, &mut rt));
        rt.outbox.clear();

        aim.on_event(&motion(100.0, 0.0), &mut WidgetContext::new(ID, &mut rt));
        let touches: Vec<_> = rt.take_touches().iter().map(|t| (t.action, t.position.x)).collect();
        assert_eq!(
            touches,
            [
                (MotionAction::Up, 1450),
                (MotionAction::Down, 1200),
                (MotionAction::Move, 1300),
            ]
        );
    }

    #[test]
    fn toggle_mode_ignores_release() {
        let (mut aim, key) = aim(AimMode::Toggle);
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());

        aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        aim.on_release(&key, &mut WidgetContext::new(ID, &mut rt));
        assert!(aim.is_aiming());
        aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        assert!(!aim.is_aiming());
    }

    #[test]
    fn exhausted_pool_refuses_to_aim() {
        let (mut aim, key) = aim(AimMode::Hold);
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());
        rt.pointers = PointerIdPool::with_size(1);
        rt.pointers.allocate(PointerOwner::Widget(WidgetId(1)));

        assert!(!aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        assert!(!aim.is_aiming());
        aim.on_event(&motion(10.0, 0.0), &mut WidgetContext::new(ID, &mut rt));
        assert!(rt.outbox.is_empty());

        rt.pointers.release(&PointerOwner::Widget(WidgetId(1)));
        assert!(aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        assert_eq!(rt.pointers.get_allocated_id(&PointerOwner::Widget(ID)), Some(1));
    }

    #[test]
    fn motion_is_clamped_to_frame() {
        let key = KeyCombination::parse("Mouse_Right", &mut KeyRegistry::new()).unwrap();
        let rect = Rect::new(1800.0, 0.0, 400.0, 400.0);
        let mut aim = Aim::new(rect, key.clone(), AimSettings { mode: AimMode::Hold, sensitivity: 50.0 });
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());

        aim.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        aim.on_event(&motion(300.0, 0.0), &mut WidgetContext::new(ID, &mut rt));
        let last = rt.take_touches().pop().unwrap();
        assert_eq!(last.action, MotionAction::Move);
        assert_eq!(last.position.x, 1919);
    }
}
