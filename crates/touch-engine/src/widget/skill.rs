use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use touch_keys::KeyCombination;
use touch_proto::MotionAction;

use super::glide::{Glide, Step};
use super::{single_binding, Binding, UnknownName, Widget, WidgetContext, WidgetKind};
use crate::bus::{Event, EventData, EventKind, PointerMotion};
use crate::geometry::{FrameSize, Point, Rect};
use crate::timer::TimerId;

/// When a skill finger is lifted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CastTiming {
    /// Lift when the key is released.
    #[default]
    OnRelease,
    /// Lift as soon as the finger reaches the aimed point.
    Immediate,
    /// Stay down and follow the cursor until the key is pressed again.
    Manual,
}

impl fmt::Display for CastTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnRelease => f.write_str("on_release"),
            Self::Immediate => f.write_str("immediate"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

impl FromStr for CastTiming {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_release" => Ok(Self::OnRelease),
            "immediate" => Ok(Self::Immediate),
            "manual" => Ok(Self::Manual),
            other => Err(UnknownName::new("cast timing", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillSettings {
    pub timing: CastTiming,
    /// Cursor distance from the frame centre that maps to the widget edge.
    pub circle_radius: f64,
    pub interval: Duration,
    pub steps: u32,
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            timing: CastTiming::OnRelease,
            circle_radius: 200.0,
            interval: Duration::from_millis(20),
            steps: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillState {
    Inactive,
    /// Sliding from the centre to the aimed point; the target is locked.
    Moving,
    /// At the aimed point and following the cursor until release.
    Active,
    /// Manual timing: following the cursor until the next press.
    Locked,
    /// Sliding to a cancel point; user input is ignored.
    Canceling,
}

/// Skill joystick aimed with the cursor.
///
/// A press puts a finger on the widget centre and slides it toward the
/// point that mirrors the cursor's offset from the frame centre. A
/// `CancelCasting` event drags the finger onto the cancel point before it
/// is lifted.
#[derive(Debug, Clone)]
pub struct SkillCasting {
    rect: Rect,
    key: KeyCombination,
    settings: SkillSettings,
    state: SkillState,
    glide: Glide,
    released_while_moving: bool,
    cancel_to: Option<Point>,
}

impl SkillCasting {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination, settings: SkillSettings) -> Self {
        let glide = Glide::new(rect.center(), settings.steps, settings.interval);
        Self {
            rect,
            key,
            settings,
            state: SkillState::Inactive,
            glide,
            released_while_moving: false,
            cancel_to: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SkillState {
        self.state
    }

    #[must_use]
    pub fn target(&self) -> Point {
        self.glide.target()
    }

    /// Map a cursor position onto the widget circle.
    ///
    /// Offsets inside `circle_radius` scale linearly to the widget radius;
    /// anything further out lands on the edge.
    #[must_use]
    pub fn cast_point(&self, cursor: Point, frame: FrameSize) -> Point {
        let center = self.rect.center();
        let origin = frame.center();
        let (dx, dy) = (cursor.x - origin.x, cursor.y - origin.y);
        let distance = dx.hypot(dy);
        if distance == 0.0 || self.settings.circle_radius <= 0.0 {
            return center;
        }
        let ratio = (distance / self.settings.circle_radius).min(1.0);
        let radius = self.rect.radius();
        Point::new(
            center.x + dx / distance * ratio * radius,
            center.y + dy / distance * ratio * radius,
        )
    }

    fn stroke(&self, action: MotionAction, at: Point, ctx: &mut WidgetContext<'_>) {
        match ctx.pointer() {
            Some(pointer) => ctx.stroke(action, pointer, at),
            None => tracing::warn!(widget = %ctx.id(), "Skill has no pointer id"),
        }
    }

    fn activate(&mut self, ctx: &mut WidgetContext<'_>) -> bool {
        let target = self.cast_point(ctx.cursor(), ctx.frame());
        if ctx.allocate_pointer().is_none() {
            tracing::warn!(widget = %ctx.id(), "No free pointer id for skill");
            return false;
        }
        let center = self.rect.center();
        self.glide.jump(center);
        self.stroke(MotionAction::Down, center, ctx);
        self.state = SkillState::Moving;
        self.glide.start(target, ctx);
        tracing::debug!(widget = %ctx.id(), ?target, "Skill casting");
        true
    }

    fn begin_cancel(&mut self, to: Point, ctx: &mut WidgetContext<'_>) {
        self.glide.stop(ctx);
        self.state = SkillState::Canceling;
        self.glide.start(to, ctx);
        tracing::debug!(widget = %ctx.id(), ?to, "Skill cancel move started");
    }

    fn arrived(&mut self, ctx: &mut WidgetContext<'_>) {
        match self.state {
            SkillState::Moving => {
                if let Some(to) = self.cancel_to {
                    self.begin_cancel(to, ctx);
                    return;
                }
                match self.settings.timing {
                    CastTiming::Immediate => self.finish(ctx),
                    CastTiming::Manual => self.state = SkillState::Locked,
                    CastTiming::OnRelease if self.released_while_moving => self.finish(ctx),
                    CastTiming::OnRelease => self.state = SkillState::Active,
                }
            }
            SkillState::Canceling => self.finish(ctx),
            _ => {}
        }
    }

    /// Lift the finger and return to the centre.
    fn finish(&mut self, ctx: &mut WidgetContext<'_>) {
        self.glide.stop(ctx);
        self.stroke(MotionAction::Up, self.glide.current(), ctx);
        ctx.release_pointer();
        self.glide.jump(self.rect.center());
        self.state = SkillState::Inactive;
        self.released_while_moving = false;
        self.cancel_to = None;
        tracing::debug!(widget = %ctx.id(), "Skill released");
    }
}

impl Widget for SkillCasting {
    fn kind(&self) -> WidgetKind {
        WidgetKind::SkillCasting
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, true)
    }

    fn event_interests(&self) -> &'static [EventKind] {
        &[EventKind::MouseMotion, EventKind::CancelCasting]
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        match self.state {
            SkillState::Inactive => self.activate(ctx),
            SkillState::Locked => {
                self.finish(ctx);
                true
            }
            SkillState::Moving | SkillState::Active | SkillState::Canceling => true,
        }
    }

    fn on_release(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        if self.settings.timing == CastTiming::OnRelease {
            match self.state {
                SkillState::Moving => self.released_while_moving = true,
                SkillState::Active => self.finish(ctx),
                _ => {}
            }
        }
        true
    }

    fn on_timer(&mut self, timer: TimerId, ctx: &mut WidgetContext<'_>) {
        let Some(step) = self.glide.tick(timer, ctx) else {
            return;
        };
        self.stroke(MotionAction::Move, self.glide.current(), ctx);
        if step == Step::Arrived {
            self.arrived(ctx);
        }
    }

    fn on_event(&mut self, event: &Event, ctx: &mut WidgetContext<'_>) {
        match event.data {
            EventData::MouseMotion(PointerMotion::Absolute(cursor)) => {
                if matches!(self.state, SkillState::Active | SkillState::Locked) {
                    let to = self.cast_point(cursor, ctx.frame());
                    self.glide.jump(to);
                    self.stroke(MotionAction::Move, to, ctx);
                }
            }
            EventData::CancelCasting(to) => {
                if self.state == SkillState::Inactive {
                    return;
                }
                self.cancel_to = Some(to);
                // A slide in progress finishes first and then heads for the
                // cancel point.
                if self.state != SkillState::Moving {
                    self.begin_cancel(to, ctx);
                }
            }
            _ => {}
        }
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        if self.state != SkillState::Inactive {
            self.finish(ctx);
        }
    }
}

/// Button that aborts every skill being cast by dragging its finger here.
#[derive(Debug, Clone)]
pub struct CancelCasting {
    rect: Rect,
    key: KeyCombination,
}

impl CancelCasting {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination) -> Self {
        Self { rect, key }
    }
}

impl Widget for CancelCasting {
    fn kind(&self) -> WidgetKind {
        WidgetKind::CancelCasting
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, false)
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        ctx.emit(EventData::CancelCasting(self.rect.center()));
        true
    }

    fn on_release(&mut self, _combination: &KeyCombination, _ctx: &mut WidgetContext<'_>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use touch_keys::KeyRegistry;

    use super::*;
    use crate::bus::Source;
    use crate::widget::Runtime;
    use crate::WidgetId;

    const ID: WidgetId = WidgetId(11);

    struct Rig {
        skill: SkillCasting,
        key: KeyCombination,
        rt: Runtime,
        t0: Instant,
    }

    impl Rig {
        fn new(timing: CastTiming) -> Self {
            let key = KeyCombination::parse("Q", &mut KeyRegistry::new()).unwrap();
            let settings = SkillSettings {
                timing,
                ..SkillSettings::default()
            };
            let rect = Rect::centered(Point::new(1500.0, 700.0), 200.0, 200.0);
            let t0 = Instant::now();
            let mut rt = Runtime::new(FrameSize::default(), t0);
            // 100px right of the frame centre: halfway to the circle edge.
            rt.cursor = Point::new(1060.0, 540.0);
            Self {
                skill: SkillCasting::new(rect, key.clone(), settings),
                key,
                rt,
                t0,
            }
        }

        fn press(&mut self) -> bool {
            let key = self.key.clone();
            self.skill.on_trigger(&key, &mut WidgetContext::new(ID, &mut self.rt))
        }

        fn release(&mut self) -> bool {
            let key = self.key.clone();
            self.skill.on_release(&key, &mut WidgetContext::new(ID, &mut self.rt))
        }

        fn event(&mut self, data: EventData) {
            let event = Event::new(Source::Widget(WidgetId(99)), data);
            self.skill.on_event(&event, &mut WidgetContext::new(ID, &mut self.rt));
        }

        fn run_until(&mut self, ms: u64) {
            let now = self.t0 + Duration::from_millis(ms);
            while let Some((timer, _, deadline)) = self.rt.timers.pop_due(now) {
                self.rt.now = deadline;
                self.skill.on_timer(timer, &mut WidgetContext::new(ID, &mut self.rt));
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
    fn cursor_maps_onto_widget_circle() {
        let rig = Rig::new(CastTiming::OnRelease);
        let frame = FrameSize::default();
        let skill = &rig.skill;
        assert_eq!(skill.cast_point(Point::new(960.0, 540.0), frame), Point::new(1500.0, 700.0));
        assert_eq!(skill.cast_point(Point::new(1060.0, 540.0), frame), Point::new(1550.0, 700.0));
        // Beyond the circle the point sticks to the edge.
        assert_eq!(skill.cast_point(Point::new(660.0, 140.0), frame), Point::new(1440.0, 620.0));
    }

    #[test]
    fn on_release_lifts_after_arriving() {
        use MotionAction::{Down, Move, Up};
        let mut rig = Rig::new(CastTiming::OnRelease);

        assert!(rig.press());
        rig.run_until(200);
        assert_eq!(rig.skill.state(), SkillState::Active);

        rig.event(EventData::MouseMotion(PointerMotion::Absolute(Point::new(960.0, 440.0))));
        assert!(rig.release());

        assert_eq!(
            rig.touches(),
            [
                (Down, 1500, 700),
                (Move, 1508, 700),
                (Move, 1516, 700),
                (Move, 1525, 700),
                (Move, 1533, 700),
                (Move, 1541, 700),
                (Move, 1550, 700),
                (Move, 1500, 650),
                (Up, 1500, 650),
            ]
        );
        assert_eq!(rig.skill.state(), SkillState::Inactive);
        assert_eq!(rig.rt.pointers.active(), 0);
        assert!(rig.rt.timers.is_empty());
    }

    #[test]
    fn release_during_slide_lifts_on_arrival() {
        let mut rig = Rig::new(CastTiming::OnRelease);
        rig.press();
        rig.run_until(40);
        rig.release();
        assert_eq!(rig.skill.state(), SkillState::Moving);

        rig.run_until(200);
        let touches = rig.touches();
        assert_eq!(touches.last(), Some(&(MotionAction::Up, 1550, 700)));
        assert_eq!(rig.skill.state(), SkillState::Inactive);
    }

    #[test]
    fn immediate_timing_needs_no_release() {
        let mut rig = Rig::new(CastTiming::Immediate);
        rig.press();
        rig.run_until(200);
        assert_eq!(rig.touches().last(), Some(&(MotionAction::Up, 1550, 700)));
        assert_eq!(rig.rt.pointers.active(), 0);
    }

    #[test]
    fn manual_timing_waits_for_second_press() {
        let mut rig = Rig::new(CastTiming::Manual);
        rig.press();
        rig.run_until(200);
        rig.release();
        assert_eq!(rig.skill.state(), SkillState::Locked);

        rig.rt.take_touches();
        assert!(rig.press());
        assert_eq!(rig.touches(), [(MotionAction::Up, 1550, 700)]);
        assert_eq!(rig.skill.state(), SkillState::Inactive);
    }

    #[test]
    fn cancel_drags_to_cancel_point_then_lifts() {
        let mut rig = Rig::new(CastTiming::OnRelease);
        rig.press();
        rig.run_until(200);
        rig.rt.take_touches();

        rig.event(EventData::CancelCasting(Point::new(1550.0, 760.0)));
        assert_eq!(rig.skill.state(), SkillState::Canceling);
        // Input is ignored while cancelling.
        assert!(rig.press());
        assert!(rig.release());

        rig.run_until(400);
        let touches = rig.touches();
        assert_eq!(touches.len(), 7);
        assert_eq!(touches[5], (MotionAction::Move, 1550, 760));
        assert_eq!(touches[6], (MotionAction::Up, 1550, 760));
        assert_eq!(rig.skill.state(), SkillState::Inactive);
    }

    #[test]
    fn cancel_during_slide_waits_for_arrival() {
        let mut rig = Rig::new(CastTiming::OnRelease);
        rig.press();
        rig.run_until(40);
        rig.event(EventData::CancelCasting(Point::new(1550.0, 760.0)));
        assert_eq!(rig.skill.state(), SkillState::Moving);

        rig.run_until(120);
        assert_eq!(rig.skill.state(), SkillState::Canceling);
        rig.run_until(400);
        let touches = rig.touches();
        assert!(touches.contains(&(MotionAction::Move, 1550, 700)));
        assert_eq!(touches.last(), Some(&(MotionAction::Up, 1550, 760)));
    }

    #[test]
    fn cancel_is_ignored_when_idle() {
        let mut rig = Rig::new(CastTiming::OnRelease);
        rig.event(EventData::CancelCasting(Point::new(10.0, 10.0)));
        assert_eq!(rig.skill.state(), SkillState::Inactive);
        assert!(rig.rt.outbox.is_empty());
    }

    #[test]
    fn exhausted_pool_refuses_trigger() {
        let mut rig = Rig::new(CastTiming::OnRelease);
        for i in 0..10 {
            rig.rt.pointers.allocate(crate::pointer::PointerOwner::Widget(WidgetId(100 + i)));
        }
        assert!(!rig.press());
        assert_eq!(rig.skill.state(), SkillState::Inactive);
        assert!(rig.rt.outbox.is_empty());
    }

    #[test]
    fn cancel_button_emits_its_center() {
        let key = KeyCombination::parse("Escape", &mut KeyRegistry::new()).unwrap();
        let mut button = CancelCasting::new(Rect::new(1700.0, 300.0, 60.0, 40.0), key.clone());
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());
        assert!(button.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        let event = rt.outbox.pop_front().unwrap();
        assert!(matches!(event.data, EventData::CancelCasting(p) if p == Point::new(1730.0, 320.0)));
        assert_eq!(event.source, Source::Widget(ID));
    }

    #[test]
    fn timing_names() {
        assert_eq!("manual".parse::<CastTiming>(), Ok(CastTiming::Manual));
        assert_eq!(CastTiming::OnRelease.to_string(), "on_release");
        assert!("later".parse::<CastTiming>().is_err());
    }
}
