use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use touch_keys::{Key, KeyCombination};
use touch_proto::MotionAction;

use super::{key_binding, Binding, UnknownName, Widget, WidgetContext, WidgetKind};
use crate::geometry::{Point, Rect};
use crate::timer::TimerId;

const DIAGONAL: f64 = 0.7071;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovementMode {
    /// Slide toward the target over several timer ticks.
    #[default]
    Smooth,
    /// Jump straight to the target.
    Instant,
}

impl MovementMode {
    /// Parse a mode name, falling back to [`MovementMode::Smooth`].
    #[must_use]
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}, using smooth");
            Self::Smooth
        })
    }
}

impl fmt::Display for MovementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smooth => f.write_str("smooth"),
            Self::Instant => f.write_str("instant"),
        }
    }
}

impl FromStr for MovementMode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smooth" => Ok(Self::Smooth),
            "instant" => Ok(Self::Instant),
            other => Err(UnknownName::new("movement mode", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpadSettings {
    pub interval: Duration,
    pub steps: u32,
    pub mode: MovementMode,
}

impl Default for DpadSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(20),
            steps: 6,
            mode: MovementMode::Smooth,
        }
    }
}

/// Keys for up, left, down and right, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpadKeys(pub [Key; 4]);

impl DpadKeys {
    #[must_use]
    pub fn new(up: Key, left: Key, down: Key, right: Key) -> Self {
        Self([up, left, down, right])
    }

    fn direction_of(&self, combination: &KeyCombination) -> Option<usize> {
        let [key] = combination.keys() else {
            return None;
        };
        self.0.iter().position(|k| k == key)
    }
}

const UP: usize = 0;
const LEFT: usize = 1;
const DOWN: usize = 2;
const RIGHT: usize = 3;

/// A virtual joystick: one finger held on the pad and steered by keys.
#[derive(Debug, Clone)]
pub struct DirectionalPad {
    rect: Rect,
    keys: DpadKeys,
    settings: DpadSettings,
    active: bool,
    pressed: [bool; 4],
    current: Point,
    target: Point,
    timer: Option<TimerId>,
    steps_done: u32,
}

impl DirectionalPad {
    #[must_use]
    pub fn new(rect: Rect, keys: DpadKeys, settings: DpadSettings) -> Self {
        let center = rect.center();
        Self {
            rect,
            keys,
            settings,
            active: false,
            pressed: [false; 4],
            current: center,
            target: center,
            timer: None,
            steps_done: 0,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn current(&self) -> Point {
        self.current
    }

    #[must_use]
    pub fn target(&self) -> Point {
        self.target
    }

    /// Where the finger should rest for the keys currently held.
    #[must_use]
    pub fn target_for(&self, pressed: [bool; 4]) -> Point {
        let r = &self.rect;
        let c = r.center();
        let d = DIAGONAL * r.radius();
        match pressed {
            [true, false, false, false] => Point::new(c.x, r.y),
            [false, true, false, false] => Point::new(r.x, c.y),
            [false, false, true, false] => Point::new(c.x, r.y + r.height),
            [false, false, false, true] => Point::new(r.x + r.width, c.y),
            [true, true, false, false] => Point::new(c.x - d, c.y - d),
            [true, false, false, true] => Point::new(c.x + d, c.y - d),
            [false, true, true, false] => Point::new(c.x - d, c.y + d),
            [false, false, true, true] => Point::new(c.x + d, c.y + d),
            // Three keys resolve to the middle key's axis.
            [true, true, true, false] => Point::new(r.x, c.y),
            [true, true, false, true] => Point::new(c.x, r.y),
            [true, false, true, true] => Point::new(r.x + r.width, c.y),
            [false, true, true, true] => Point::new(c.x, r.y + r.height),
            _ => c,
        }
    }

    fn emit(&self, action: MotionAction, at: Point, ctx: &mut WidgetContext<'_>) {
        let Some(pointer) = ctx.pointer() else {
            tracing::warn!(widget = %ctx.id(), "Directional pad has no pointer id");
            return;
        };
        ctx.stroke(action, pointer, at);
    }

    fn move_to(&mut self, target: Point, smooth: bool, ctx: &mut WidgetContext<'_>) {
        self.target = target;
        if self.timer.is_some() {
            return;
        }
        if smooth && self.settings.mode == MovementMode::Smooth && self.settings.steps > 0 {
            self.steps_done = 0;
            self.timer = Some(ctx.schedule(self.settings.interval));
            tracing::debug!(widget = %ctx.id(), ?target, "Smooth move started");
        } else {
            self.current = target;
            if self.active {
                self.emit(MotionAction::Move, self.current, ctx);
            }
        }
    }
}

impl Widget for DirectionalPad {
    fn kind(&self) -> WidgetKind {
        WidgetKind::DirectionalPad
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        self.keys.0.iter().map(key_binding).collect()
    }

    fn on_trigger(&mut self, combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        let Some(direction) = self.keys.direction_of(combination) else {
            tracing::debug!(widget = %ctx.id(), %combination, "Not a direction key");
            return false;
        };

        if self.active {
            self.pressed[direction] = true;
            let target = self.target_for(self.pressed);
            self.move_to(target, false, ctx);
            return true;
        }

        if ctx.allocate_pointer().is_none() {
            tracing::warn!(widget = %ctx.id(), "No free pointer id for directional pad");
            return false;
        }
        self.pressed[direction] = true;
        self.active = true;
        self.current = self.rect.center();
        self.emit(MotionAction::Down, self.current, ctx);
        let target = self.target_for(self.pressed);
        self.move_to(target, true, ctx);
        true
    }

    fn on_release(&mut self, combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        let Some(direction) = self.keys.direction_of(combination) else {
            return false;
        };
        self.pressed[direction] = false;

        if self.pressed.iter().any(|p| *p) {
            let target = self.target_for(self.pressed);
            self.move_to(target, false, ctx);
            return true;
        }

        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        if self.active {
            self.emit(MotionAction::Up, self.current, ctx);
            ctx.release_pointer();
            self.active = false;
        }
        let center = self.rect.center();
        self.current = center;
        self.target = center;
        tracing::debug!(widget = %ctx.id(), "Joystick returned to center");
        true
    }

    fn on_timer(&mut self, timer: TimerId, ctx: &mut WidgetContext<'_>) {
        if self.timer != Some(timer) {
            return;
        }
        if self.steps_done >= self.settings.steps {
            self.current = self.target;
            self.timer = None;
            return;
        }

        let remaining = f64::from(self.settings.steps - self.steps_done);
        self.current = Point::new(
            self.current.x + (self.target.x - self.current.x) / remaining,
            self.current.y + (self.target.y - self.current.y) / remaining,
        );
        self.steps_done += 1;
        if self.active {
            self.emit(MotionAction::Move, self.current, ctx);
        }
        self.timer = Some(ctx.schedule(self.settings.interval));
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        if self.active {
            self.emit(MotionAction::Up, self.current, ctx);
            ctx.release_pointer();
            self.active = false;
        }
        self.pressed = [false; 4];
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use touch_keys::KeyRegistry;

    use super::*;
    use crate::geometry::FrameSize;
    use crate::widget::Runtime;
    use crate::WidgetId;

    const ID: WidgetId = WidgetId(7);

    struct Rig {
        pad: DirectionalPad,
        rt: Runtime,
        t0: Instant,
        wasd: Vec<KeyCombination>,
    }

    impl Rig {
        fn new(mode: MovementMode) -> Self {
            let mut registry = KeyRegistry::new();
            let wasd: Vec<KeyCombination> = ["W", "A", "S", "D"]
                .iter()
                .map(|n| KeyCombination::parse(n, &mut registry).unwrap())
                .collect();
            let keys = DpadKeys::new(
                wasd[0].keys()[0].clone(),
                wasd[1].keys()[0].clone(),
                wasd[2].keys()[0].clone(),
                wasd[3].keys()[0].clone(),
            );
            let settings = DpadSettings {
                mode,
                ..DpadSettings::default()
            };
            let t0 = Instant::now();
            Self {
                pad: DirectionalPad::new(Rect::new(320.0, 320.0, 160.0, 160.0), keys, settings),
                rt: Runtime::new(FrameSize::default(), t0),
                t0,
                wasd,
            }
        }

        fn press(&mut self, i: usize) -> bool {
            let combination = self.wasd[i].clone();
            self.pad.on_trigger(&combination, &mut WidgetContext::new(ID, &mut self.rt))
        }

        fn release(&mut self, i: usize) -> bool {
            let combination = self.wasd[i].clone();
            self.pad.on_release(&combination, &mut WidgetContext::new(ID, &mut self.rt))
        }

        fn run_until(&mut self, ms: u64) {
            let now = self.t0 + Duration::from_millis(ms);
            while let Some((timer, _, deadline)) = self.rt.timers.pop_due(now) {
                self.rt.now = deadline;
                self.pad.on_timer(timer, &mut WidgetContext::new(ID, &mut self.rt));
            }
            self.rt.now = now;
        }

        fn touches(&mut self) -> Vec<(MotionAction, i32, i32)> {
            self.rt
                .take_touches()
                .into_iter()
                .map(|t| (t.action, t.position.x, t.position.y))
                .collect()
        }
    }

    #[test]
    fn smooth_slide_up_and_back() {
        use MotionAction::{Down, Move, Up};
        let mut rig = Rig::new(MovementMode::Smooth);

        assert!(rig.press(0));
        rig.run_until(500);
        assert!(rig.release(0));

        assert_eq!(
            rig.touches(),
            [
                (Down, 400, 400),
                (Move, 400, 386),
                (Move, 400, 373),
                (Move, 400, 360),
                (Move, 400, 346),
                (Move, 400, 333),
                (Move, 400, 320),
                (Up, 400, 320),
            ]
        );
        assert_eq!(rig.pad.current(), Point::new(400.0, 400.0));
        assert!(rig.rt.timers.is_empty());
        assert_eq!(rig.rt.pointers.active(), 0);
    }

    #[test]
    fn target_table() {
        let rig = Rig::new(MovementMode::Smooth);
        let d = 0.7071 * 80.0;
        let pad = &rig.pad;
        assert_eq!(pad.target_for([true, true, false, false]), Point::new(400.0 - d, 400.0 - d));
        assert_eq!(pad.target_for([false, false, true, true]), Point::new(400.0 + d, 400.0 + d));
        assert_eq!(pad.target_for([true, true, true, false]), Point::new(320.0, 400.0));
        assert_eq!(pad.target_for([true, true, false, true]), Point::new(400.0, 320.0));
        assert_eq!(pad.target_for([true, false, true, true]), Point::new(480.0, 400.0));
        assert_eq!(pad.target_for([false, true, true, true]), Point::new(400.0, 480.0));
        assert_eq!(pad.target_for([true, false, true, false]), Point::new(400.0, 400.0));
        assert_eq!(pad.target_for([true; 4]), Point::new(400.0, 400.0));
    }

    #[test]
    fn retarget_while_sliding_keeps_timer() {
        let mut rig = Rig::new(MovementMode::Smooth);
        rig.press(0);
        rig.run_until(20);
        rig.press(1);

        // Only the target moved; no extra MOVE was emitted.
        assert_eq!(rig.touches().len(), 2);
        let d = 0.7071 * 80.0;
        assert_eq!(rig.pad.target(), Point::new(400.0 - d, 400.0 - d));

        rig.run_until(1000);
        assert_eq!(rig.pad.current(), rig.pad.target());
        assert!(rig.rt.timers.is_empty());
    }

    #[test]
    fn instant_mode_moves_once() {
        use MotionAction::{Down, Move};
        let mut rig = Rig::new(MovementMode::Instant);
        rig.press(3);
        rig.press(2);

        let d = (400.0 + 0.7071 * 80.0) as i32;
        assert_eq!(rig.touches(), [(Down, 400, 400), (Move, 480, 400), (Move, d, d)]);
        assert!(rig.rt.timers.is_empty());
    }

    #[test]
    fn unknown_mode_falls_back() {
        assert_eq!(MovementMode::parse_or_default("instant"), MovementMode::Instant);
        assert_eq!(MovementMode::parse_or_default("teleport"), MovementMode::Smooth);
    }

    #[test]
    fn foreign_key_is_ignored() {
        let mut rig = Rig::new(MovementMode::Smooth);
        let other = KeyCombination::parse("Q", &mut KeyRegistry::new()).unwrap();
        assert!(!rig.pad.on_trigger(&other, &mut WidgetContext::new(ID, &mut rig.rt)));
        assert!(!rig.pad.is_active());
    }
}
