use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use touch_keys::KeyCombination;

use super::{single_binding, Binding, UnknownName, Widget, WidgetContext, WidgetKind};
use crate::geometry::Rect;
use crate::timer::TimerId;

/// Cadence of the burst started by [`OperatingMethod::ClickAfterRelease`].
const BURST_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperatingMethod {
    /// Tap repeatedly for as long as the key is held.
    #[default]
    LongPressCombo,
    /// Fire a fixed number of taps once the key is released.
    ClickAfterRelease,
}

impl fmt::Display for OperatingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongPressCombo => f.write_str("long_press_combo"),
            Self::ClickAfterRelease => f.write_str("click_after_release"),
        }
    }
}

impl FromStr for OperatingMethod {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long_press_combo" => Ok(Self::LongPressCombo),
            "click_after_release" | "click_after_button" => Ok(Self::ClickAfterRelease),
            other => Err(UnknownName::new("operating method", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatedClickSettings {
    pub method: OperatingMethod,
    /// Time between taps while held.
    pub interval: Duration,
    /// Taps fired after release.
    pub click_count: u32,
}

impl Default for RepeatedClickSettings {
    fn default() -> Self {
        Self {
            method: OperatingMethod::default(),
            interval: Duration::from_millis(60),
            click_count: 20,
        }
    }
}

/// Taps the centre of its rectangle over and over.
#[derive(Debug, Clone)]
pub struct RepeatedClick {
    rect: Rect,
    key: KeyCombination,
    settings: RepeatedClickSettings,
    timer: Option<TimerId>,
    down: bool,
    /// Taps still owed by a release burst.
    remaining: u32,
}

impl RepeatedClick {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination, settings: RepeatedClickSettings) -> Self {
        Self {
            rect,
            key,
            settings,
            timer: None,
            down: false,
            remaining: 0,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RepeatedClickSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.timer.is_some() || self.down
    }

    fn press(&mut self, ctx: &mut WidgetContext<'_>) -> bool {
        let Some(pointer) = ctx.allocate_pointer() else {
            tracing::warn!(widget = %ctx.id(), "No free pointer id for repeated click");
            return false;
        };
        ctx.finger_down(pointer, self.rect.center());
        self.down = true;
        true
    }

    fn lift(&mut self, ctx: &mut WidgetContext<'_>) {
        if self.down {
            if let Some(pointer) = ctx.pointer() {
                ctx.finger_up(pointer, self.rect.center());
            }
            self.down = false;
        }
    }

    /// Lift the finger, drop the timer and give the pointer id back.
    fn stop(&mut self, ctx: &mut WidgetContext<'_>) {
        self.lift(ctx);
        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        self.remaining = 0;
        ctx.release_pointer();
    }
}

impl Widget for RepeatedClick {
    fn kind(&self) -> WidgetKind {
        WidgetKind::RepeatedClick
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, true)
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        match self.settings.method {
            OperatingMethod::LongPressCombo => {
                if self.is_active() {
                    return true;
                }
                if !self.press(ctx) {
                    return false;
                }
                self.timer = Some(ctx.schedule(self.settings.interval));
                true
            }
            OperatingMethod::ClickAfterRelease => {
                if self.is_active() {
                    tracing::debug!(widget = %ctx.id(), "Click burst interrupted");
                    self.stop(ctx);
                }
                true
            }
        }
    }

    fn on_release(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        match self.settings.method {
            OperatingMethod::LongPressCombo => {
                if !self.is_active() {
                    return false;
                }
                self.stop(ctx);
                true
            }
            OperatingMethod::ClickAfterRelease => {
                self.stop(ctx);
                if self.settings.click_count == 0 || !self.press(ctx) {
                    return false;
                }
                self.remaining = self.settings.click_count;
                self.timer = Some(ctx.schedule(BURST_INTERVAL));
                true
            }
        }
    }

    fn on_timer(&mut self, timer: TimerId, ctx: &mut WidgetContext<'_>) {
        if self.timer != Some(timer) {
            return;
        }
        self.timer = None;
        match self.settings.method {
            OperatingMethod::LongPressCombo => {
                self.lift(ctx);
                if self.press(ctx) {
                    self.timer = Some(ctx.schedule(self.settings.interval));
                }
            }
            OperatingMethod::ClickAfterRelease => {
                self.lift(ctx);
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining > 0 && self.press(ctx) {
                    self.timer = Some(ctx.schedule(BURST_INTERVAL));
                } else {
                    self.stop(ctx);
                }
            }
        }
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        self.stop(ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use touch_keys::KeyRegistry;
    use touch_proto::MotionAction;

    use super::*;
    use crate::geometry::{FrameSize, Point};
    use crate::widget::Runtime;
    use crate::WidgetId;

    const ID: WidgetId = WidgetId(3);

    fn space() -> KeyCombination {
        KeyCombination::parse("Space", &mut KeyRegistry::new()).unwrap()
    }

    fn fire_due(widget: &mut RepeatedClick, rt: &mut Runtime, now: Instant) {
        while let Some((timer, owner, deadline)) = rt.timers.pop_due(now) {
            assert_eq!(owner, ID);
            rt.now = deadline;
            widget.on_timer(timer, &mut WidgetContext::new(ID, rt));
        }
        rt.now = now;
    }

    fn actions(rt: &mut Runtime) -> Vec<MotionAction> {
        rt.take_touches().into_iter().map(|t| t.action).collect()
    }

    #[test]
    fn long_press_taps_while_held() {
        use MotionAction::{Down, Up};
        let key = space();
        let t0 = Instant::now();
        let mut rt = Runtime::new(FrameSize::default(), t0);
        let rect = Rect::centered(Point::new(500.0, 500.0), 40.0, 40.0);
        let mut widget = RepeatedClick::new(rect, key.clone(), RepeatedClickSettings::default());

        assert!(widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        // Re-entrant press while active changes nothing.
        assert!(widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        fire_due(&mut widget, &mut rt, t0 + Duration::from_millis(200));
        assert!(widget.on_release(&key, &mut WidgetContext::new(ID, &mut rt)));

        assert_eq!(actions(&mut rt), [Down, Up, Down, Up, Down, Up, Down, Up]);
        assert!(rt.timers.is_empty());
        assert_eq!(rt.pointers.active(), 0);
        assert!(!widget.on_release(&key, &mut WidgetContext::new(ID, &mut rt)));
    }

    #[test]
    fn burst_after_release() {
        let key = space();
        let t0 = Instant::now();
        let mut rt = Runtime::new(FrameSize::default(), t0);
        let settings = RepeatedClickSettings {
            method: OperatingMethod::ClickAfterRelease,
            click_count: 3,
            ..RepeatedClickSettings::default()
        };
        let mut widget = RepeatedClick::new(Rect::new(0.0, 0.0, 10.0, 10.0), key.clone(), settings);

        assert!(widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        assert!(rt.take_touches().is_empty());
        assert!(widget.on_release(&key, &mut WidgetContext::new(ID, &mut rt)));
        fire_due(&mut widget, &mut rt, t0 + Duration::from_secs(1));

        let downs = actions(&mut rt).iter().filter(|a| **a == MotionAction::Down).count();
        assert_eq!(downs, 3);
        assert!(!widget.is_active());
        assert_eq!(rt.pointers.active(), 0);
    }

    #[test]
    fn new_press_cancels_burst() {
        let key = space();
        let t0 = Instant::now();
        let mut rt = Runtime::new(FrameSize::default(), t0);
        let settings = RepeatedClickSettings {
            method: OperatingMethod::ClickAfterRelease,
            ..RepeatedClickSettings::default()
        };
        let mut widget = RepeatedClick::new(Rect::new(0.0, 0.0, 10.0, 10.0), key.clone(), settings);

        widget.on_release(&key, &mut WidgetContext::new(ID, &mut rt));
        widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));

        assert_eq!(actions(&mut rt), [MotionAction::Down, MotionAction::Up]);
        assert!(rt.timers.is_empty());
    }

    #[test]
    fn method_names() {
        assert_eq!("click_after_button".parse(), Ok(OperatingMethod::ClickAfterRelease));
        assert_eq!(OperatingMethod::LongPressCombo.to_string(), "long_press_combo");
        assert!("hold".parse::<OperatingMethod>().is_err());
    }
}
