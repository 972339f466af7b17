//! Timer-driven finger slides shared by widgets that steer one finger.

use std::time::Duration;

use super::WidgetContext;
use crate::geometry::Point;
use crate::timer::TimerId;

/// Outcome of one slide tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Moved,
    Arrived,
}

/// Moves a point toward a target over a fixed number of timer ticks.
///
/// Each tick covers an equal share of the remaining distance, so a target
/// changed mid-slide is still reached on the last tick.
#[derive(Debug, Clone)]
pub(crate) struct Glide {
    current: Point,
    target: Point,
    steps: u32,
    interval: Duration,
    done: u32,
    timer: Option<TimerId>,
}

impl Glide {
    pub(crate) fn new(at: Point, steps: u32, interval: Duration) -> Self {
        Self {
            current: at,
            target: at,
            steps: steps.max(1),
            interval,
            done: 0,
            timer: None,
        }
    }

    pub(crate) fn current(&self) -> Point {
        self.current
    }

    pub(crate) fn target(&self) -> Point {
        self.target
    }

    pub(crate) fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Slide toward `target`. A running slide keeps its timer and bends
    /// toward the new target.
    pub(crate) fn start(&mut self, target: Point, ctx: &mut WidgetContext<'_>) {
        self.target = target;
        if self.timer.is_none() {
            self.done = 0;
            self.timer = Some(ctx.schedule(self.interval));
        }
    }

    /// Place the point without sliding.
    pub(crate) fn jump(&mut self, to: Point) {
        self.current = to;
        self.target = to;
    }

    pub(crate) fn stop(&mut self, ctx: &mut WidgetContext<'_>) {
        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        self.done = 0;
    }

    /// Advance one step if `timer` belongs to this slide.
    pub(crate) fn tick(&mut self, timer: TimerId, ctx: &mut WidgetContext<'_>) -> Option<Step> {
        if self.timer != Some(timer) {
            return None;
        }
        let remaining = f64::from(self.steps.saturating_sub(self.done).max(1));
        self.current = Point::new(
            self.current.x + (self.target.x - self.current.x) / remaining,
            self.current.y + (self.target.y - self.current.y) / remaining,
        );
        self.done += 1;
        if self.done >= self.steps {
            self.current = self.target;
            self.timer = None;
            Some(Step::Arrived)
        } else {
            self.timer = Some(ctx.schedule(self.interval));
            Some(Step::Moved)
        }
    }
}
