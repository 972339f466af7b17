//! Keyboard and mouse to touch mapping engine.
//!
//! Widgets placed over the host frame are bound to key combinations. Host
//! input runs through a prioritised handler chain; mapped keys drive the
//! widgets and everything else falls back to plain key, text and mouse
//! forwarding. Every outgoing message is published on the event bus as a
//! `ControlMessage` event.
//!
//! - [`engine`]: the owned engine, its mode and timer driving
//! - [`bus`]: typed publish/subscribe with priorities and filters
//! - [`mapping`]: key combination subscriptions and longest-match dispatch
//! - [`handler`]: the input handler chain and the default handlers
//! - [`widget`]: widget kinds and the context they emit through
//! - [`pointer`]: the shared touch pointer id pool
//! - [`timer`]: one-shot timers keyed by widget

pub mod bus;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod handler;
pub mod input;
pub mod mapping;
pub mod pointer;
pub mod timer;
pub mod widget;

pub use bus::{Event, EventBus, EventData, EventKind, HandlerId, PointerMotion, Source, Subscriber};
pub use engine::{Core, Engine, EngineSettings, Mode};
pub use error::HandlerError;
pub use geometry::{FrameSize, Point, Rect};
pub use handler::{
    DefaultKeyHandler, DefaultMouseHandler, HandlerChain, HandlerPriority, InputHandler,
    InputSettings, KeyInjectMode,
};
pub use input::InputEvent;
pub use mapping::{KeyMappingManager, KeySubscription};
pub use widget::{Widget, WidgetId, WidgetKind, WidgetSpec};
