use std::time::Duration;

use touch_keys::KeyCombination;
use touch_proto::MotionAction;

use super::glide::{Glide, Step};
use super::{single_binding, Binding, Widget, WidgetContext, WidgetKind};
use crate::geometry::{Point, Rect};
use crate::timer::TimerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkSettings {
    pub interval: Duration,
    pub steps: u32,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(20),
            steps: 6,
        }
    }
}

/// Click-to-move: each click pushes the joystick toward the clicked side
/// of the screen, then lets go.
#[derive(Debug, Clone)]
pub struct RightClickToWalk {
    rect: Rect,
    key: KeyCombination,
    active: bool,
    glide: Glide,
}

impl RightClickToWalk {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination, settings: WalkSettings) -> Self {
        let glide = Glide::new(rect.center(), settings.steps, settings.interval);
        Self {
            rect,
            key,
            active: false,
            glide,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Joystick edge point in the direction of `cursor` from the frame
    /// centre. `None` when the cursor sits on the centre.
    #[must_use]
    pub fn walk_target(&self, cursor: Point, origin: Point) -> Option<Point> {
        let (dx, dy) = (cursor.x - origin.x, cursor.y - origin.y);
        let length = dx.hypot(dy);
        if length == 0.0 {
            return None;
        }
        let center = self.rect.center();
        let radius = self.rect.radius();
        Some(Point::new(center.x + dx / length * radius, center.y + dy / length * radius))
    }

    fn stroke(&self, action: MotionAction, at: Point, ctx: &mut WidgetContext<'_>) {
        if let Some(pointer) = ctx.pointer() {
            ctx.stroke(action, pointer, at);
        }
    }

    fn lift(&mut self, ctx: &mut WidgetContext<'_>) {
        self.stroke(MotionAction::Up, self.glide.current(), ctx);
        ctx.release_pointer();
        self.active = false;
        self.glide.jump(self.rect.center());
    }
}

impl Widget for RightClickToWalk {
    fn kind(&self) -> WidgetKind {
        WidgetKind::RightClickToWalk
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, true)
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        let Some(target) = self.walk_target(ctx.cursor(), ctx.frame().center()) else {
            tracing::debug!(widget = %ctx.id(), "Click on frame centre, not walking");
            return false;
        };

        if !self.active {
            if ctx.allocate_pointer().is_none() {
                tracing::warn!(widget = %ctx.id(), "No free pointer id for walking");
                return false;
            }
            self.active = true;
            let center = self.rect.center();
            self.glide.jump(center);
            self.stroke(MotionAction::Down, center, ctx);
        } else if self.glide.is_running() {
            tracing::debug!(widget = %ctx.id(), ?target, "Walk retargeted");
        }
        self.glide.start(target, ctx);
        true
    }

    fn on_release(&mut self, _combination: &KeyCombination, _ctx: &mut WidgetContext<'_>) -> bool {
        true
    }

    fn on_timer(&mut self, timer: TimerId, ctx: &mut WidgetContext<'_>) {
        let Some(step) = self.glide.tick(timer, ctx) else {
            return;
        };
        self.stroke(MotionAction::Move, self.glide.current(), ctx);
        if step == Step::Arrived {
            self.lift(ctx);
        }
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        self.glide.stop(ctx);
        if self.active {
            self.lift(ctx);
        }
    }
}
