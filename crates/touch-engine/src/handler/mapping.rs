use super::{HandlerPriority, InputHandler};
use crate::engine::{Core, Mode};
use crate::error::HandlerError;
use crate::input::InputEvent;

/// Feeds key and mouse button events into the key mapping manager.
#[derive(Debug, Default)]
pub struct KeyMappingHandler;

impl KeyMappingHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InputHandler for KeyMappingHandler {
    fn name(&self) -> &'static str {
        "key_mapping"
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::NORMAL
    }

    fn can_handle(&self, event: &InputEvent) -> bool {
        event.is_press() || event.is_release()
    }

    fn handle(&mut self, event: &InputEvent, core: &mut Core) -> Result<bool, HandlerError> {
        if core.mode() == Mode::Edit {
            return Ok(false);
        }
        if let Some(position) = event.position() {
            core.set_cursor(position);
        }
        let Some(key) = event.key() else {
            return Ok(false);
        };

        let consumed = if event.is_press() {
            core.press_key(key.clone())
        } else {
            core.release_key(key)
        };
        tracing::trace!(key = %key, press = event.is_press(), consumed, "Key mapping input");
        Ok(consumed)
    }
}
