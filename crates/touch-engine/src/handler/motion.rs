use super::{HandlerPriority, InputHandler};
use crate::bus::{EventData, PointerMotion, Source};
use crate::engine::Core;
use crate::error::HandlerError;
use crate::input::InputEvent;

const NAME: &str = "motion_relay";

/// Tracks the cursor and republishes pointer motion on the bus.
///
/// Absolute motion always continues down the chain so the default mouse
/// handler can hover or drag. Relative motion is swallowed while an aim
/// widget holds the pointer.
#[derive(Debug, Default)]
pub struct MotionRelayHandler;

impl MotionRelayHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InputHandler for MotionRelayHandler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::HIGH
    }

    fn can_handle(&self, event: &InputEvent) -> bool {
        matches!(
            event,
            InputEvent::Motion { .. } | InputEvent::RelativeMotion { .. }
        )
    }

    fn handle(&mut self, event: &InputEvent, core: &mut Core) -> Result<bool, HandlerError> {
        match *event {
            InputEvent::Motion { position } => {
                core.set_cursor(position);
                core.emit(
                    Source::Handler(NAME),
                    EventData::MouseMotion(PointerMotion::Absolute(position)),
                );
                Ok(false)
            }
            InputEvent::RelativeMotion { dx, dy } => {
                core.emit(
                    Source::Handler(NAME),
                    EventData::MouseMotion(PointerMotion::Relative { dx, dy }),
                );
                Ok(core.pointer_locked())
            }
            _ => Ok(false),
        }
    }
}
