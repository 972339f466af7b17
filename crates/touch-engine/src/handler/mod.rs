//! Prioritised chain of input handlers.
//!
//! Every host event walks the chain from the highest priority (lowest
//! number) down. The first handler that reports the event as consumed stops
//! the walk. Failing handlers are logged and skipped.

mod default;
mod mapping;
mod motion;

use std::fmt;

use crate::engine::Core;
use crate::error::HandlerError;
use crate::input::InputEvent;

pub use default::{DefaultKeyHandler, DefaultMouseHandler, InputSettings, KeyInjectMode};
pub use mapping::KeyMappingHandler;
pub use motion::MotionRelayHandler;

/// Position of a handler in the chain. Lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerPriority(pub u8);

impl HandlerPriority {
    pub const HIGHEST: Self = Self(0);
    pub const HIGH: Self = Self(10);
    pub const NORMAL: Self = Self(50);
    pub const LOW: Self = Self(90);
    pub const LOWEST: Self = Self(100);
}

impl fmt::Display for HandlerPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait InputHandler {
    fn name(&self) -> &'static str;

    fn priority(&self) -> HandlerPriority;

    fn can_handle(&self, event: &InputEvent) -> bool;

    /// Process `event`. `Ok(true)` consumes it.
    fn handle(&mut self, event: &InputEvent, core: &mut Core) -> Result<bool, HandlerError>;
}

/// Summary of a registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerInfo {
    pub name: &'static str,
    pub priority: HandlerPriority,
    pub enabled: bool,
}

struct Entry {
    handler: Box<dyn InputHandler>,
    enabled: bool,
}

pub struct HandlerChain {
    handlers: Vec<Entry>,
    enabled: bool,
}

impl Default for HandlerChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handlers", &self.info())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl HandlerChain {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            enabled: true,
        }
    }

    /// Insert a handler. Equal priorities keep insertion order.
    pub fn add(&mut self, handler: Box<dyn InputHandler>) {
        tracing::info!(
            handler = handler.name(),
            priority = %handler.priority(),
            "Input handler added"
        );
        self.handlers.push(Entry {
            handler,
            enabled: true,
        });
        self.handlers.sort_by_key(|e| e.handler.priority());
    }

    /// Remove every handler called `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|e| e.handler.name() != name);
        let removed = self.handlers.len() != before;
        if removed {
            tracing::info!(handler = name, "Input handler removed");
        }
        removed
    }

    /// Enable or disable one handler by name.
    pub fn set_handler_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let mut found = false;
        for entry in self.handlers.iter_mut().filter(|e| e.handler.name() == name) {
            entry.enabled = enabled;
            found = true;
        }
        found
    }

    /// Enable or disable the whole chain.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn info(&self) -> Vec<HandlerInfo> {
        self.handlers
            .iter()
            .map(|e| HandlerInfo {
                name: e.handler.name(),
                priority: e.handler.priority(),
                enabled: e.enabled,
            })
            .collect()
    }

    /// Run `event` through the chain. Returns whether it was consumed.
    pub fn dispatch(&mut self, event: &InputEvent, core: &mut Core) -> bool {
        if !self.enabled {
            return false;
        }

        for entry in self.handlers.iter_mut().filter(|e| e.enabled) {
            let handler = &mut entry.handler;
            if !handler.can_handle(event) {
                continue;
            }
            match handler.handle(event, core) {
                Ok(true) => {
                    tracing::trace!(handler = handler.name(), "Input consumed");
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(handler = handler.name(), "Input handler failed: {e}");
                }
            }
        }
        tracing::trace!(?event, "Input not consumed");
        false
    }
}
