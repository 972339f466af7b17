use touch_keys::KeyCombination;

use super::{single_binding, Binding, Widget, WidgetContext, WidgetKind};
use crate::bus::{Event, EventData, EventKind};
use crate::geometry::Rect;

/// Fire button for shooters; taps only while an aim widget is engaged.
#[derive(Debug, Clone)]
pub struct Fire {
    rect: Rect,
    key: KeyCombination,
    aim_active: bool,
}

impl Fire {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination) -> Self {
        Self {
            rect,
            key,
            aim_active: false,
        }
    }
}

impl Widget for Fire {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Fire
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, false)
    }

    fn event_interests(&self) -> &'static [EventKind] {
        &[EventKind::AimTriggered, EventKind::AimReleased]
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        if !self.aim_active {
            return false;
        }
        let Some(pointer) = ctx.allocate_pointer() else {
            tracing::warn!(widget = %ctx.id(), "No free pointer id for fire");
            return false;
        };
        ctx.finger_down(pointer, self.rect.center());
        true
    }

    fn on_release(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        let Some(pointer) = ctx.pointer() else {
            return false;
        };
        ctx.finger_up(pointer, self.rect.center());
        ctx.release_pointer();
        true
    }

    fn on_event(&mut self, event: &Event, _ctx: &mut WidgetContext<'_>) {
        match event.data {
            EventData::AimTriggered => self.aim_active = true,
            EventData::AimReleased => self.aim_active = false,
            _ => {}
        }
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        let key = self.key.clone();
        self.on_release(&key, ctx);
    }
}
