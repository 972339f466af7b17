use touch_keys::KeyCombination;

use super::{single_binding, Binding, Widget, WidgetContext, WidgetKind};
use crate::geometry::Rect;

/// Press and hold at the centre while the key is held.
#[derive(Debug, Clone)]
pub struct SingleClick {
    rect: Rect,
    key: KeyCombination,
}

impl SingleClick {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination) -> Self {
        Self { rect, key }
    }
}

impl Widget for SingleClick {
    fn kind(&self) -> WidgetKind {
        WidgetKind::SingleClick
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, false)
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        let Some(pointer) = ctx.allocate_pointer() else {
            tracing::warn!(widget = %ctx.id(), "No free pointer id, click dropped");
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

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        let key = self.key.clone();
        self.on_release(&key, ctx);
    }
}
