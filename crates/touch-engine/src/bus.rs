//! Typed publish/subscribe bus owned by the engine.
//!
//! Handlers of an event kind run in descending priority; equal priorities run
//! in subscription order. A handler's filter is evaluated first. Handler
//! errors are logged and do not stop delivery to the remaining handlers.

use std::fmt;

use touch_keys::Key;
use touch_proto::ControlMessage;

use crate::engine::Mode;
use crate::error::HandlerError;
use crate::geometry::Point;
use crate::widget::WidgetSpec;
use crate::WidgetId;

/// Every kind of event the bus carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ModeChanged,
    AimTriggered,
    AimReleased,
    ControlMessage,
    MacroKeyPressed,
    MacroKeyReleased,
    MacroReleaseAll,
    CreateWidget,
    DeleteWidget,
    MouseMotion,
    MaskClicked,
    WidgetSelectionOverlay,
    CancelCasting,
    SettingsDialog,
}

/// Pointer motion republished for widgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerMotion {
    /// Cursor moved to an absolute frame position.
    Absolute(Point),
    /// Unaccelerated deltas while the pointer is locked.
    Relative { dx: f64, dy: f64 },
}

/// Event payloads.
#[derive(Debug, Clone)]
pub enum EventData {
    ModeChanged(Mode),
    AimTriggered,
    AimReleased,
    ControlMessage(ControlMessage),
    MacroKeyPressed(Key),
    MacroKeyReleased(Key),
    MacroReleaseAll,
    CreateWidget(WidgetSpec),
    DeleteWidget(WidgetId),
    MouseMotion(PointerMotion),
    MaskClicked(Point),
    WidgetSelectionOverlay { widget: WidgetId, selected: bool },
    /// Drag every casting skill onto this point and lift it.
    CancelCasting(Point),
    SettingsDialog(WidgetId),
}

impl EventData {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ModeChanged(_) => EventKind::ModeChanged,
            Self::AimTriggered => EventKind::AimTriggered,
            Self::AimReleased => EventKind::AimReleased,
            Self::ControlMessage(_) => EventKind::ControlMessage,
            Self::MacroKeyPressed(_) => EventKind::MacroKeyPressed,
            Self::MacroKeyReleased(_) => EventKind::MacroKeyReleased,
            Self::MacroReleaseAll => EventKind::MacroReleaseAll,
            Self::CreateWidget(_) => EventKind::CreateWidget,
            Self::DeleteWidget(_) => EventKind::DeleteWidget,
            Self::MouseMotion(_) => EventKind::MouseMotion,
            Self::MaskClicked(_) => EventKind::MaskClicked,
            Self::WidgetSelectionOverlay { .. } => EventKind::WidgetSelectionOverlay,
            Self::CancelCasting(_) => EventKind::CancelCasting,
            Self::SettingsDialog(_) => EventKind::SettingsDialog,
        }
    }
}

/// Who emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Engine,
    Widget(WidgetId),
    Handler(&'static str),
    External,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub source: Source,
    pub data: EventData,
}

impl Event {
    #[must_use]
    pub fn new(source: Source, data: EventData) -> Self {
        Self { source, data }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.data.kind()
    }
}

/// Tag used to remove a group of subscriptions at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscriber {
    Engine,
    Widget(WidgetId),
    Named(String),
}

/// Identifier returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

pub type Callback = Box<dyn FnMut(&Event) -> Result<(), HandlerError>>;
pub type Filter = Box<dyn Fn(&Event) -> bool>;

/// Where a subscription delivers.
pub enum Target {
    /// A closure owned by the bus.
    Callback(Callback),
    /// A widget owned by the engine.
    Widget(WidgetId),
    /// The engine itself.
    Engine,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback"),
            Self::Widget(id) => f.debug_tuple("Widget").field(id).finish(),
            Self::Engine => f.write_str("Engine"),
        }
    }
}

/// Delivery to a target the bus does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Widget(WidgetId),
    Engine,
}

struct Subscription {
    id: HandlerId,
    kind: EventKind,
    target: Target,
    filter: Option<Filter>,
    priority: i32,
    subscriber: Option<Subscriber>,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        target: Target,
        filter: Option<Filter>,
        priority: i32,
        subscriber: Option<Subscriber>,
    ) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        tracing::trace!(%id, ?kind, ?target, priority, "Bus subscription added");
        self.subscriptions.push(Subscription {
            id,
            kind,
            target,
            filter,
            priority,
            subscriber,
        });
        id
    }

    /// Subscribe a closure at priority 0 without filter or tag.
    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&Event) -> Result<(), HandlerError> + 'static,
    ) -> HandlerId {
        self.subscribe(kind, Target::Callback(Box::new(callback)), None, 0, None)
    }

    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Remove every subscription tagged with `subscriber`.
    pub fn unsubscribe_by_subscriber(&mut self, subscriber: &Subscriber) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|s| s.subscriber.as_ref() != Some(subscriber));
        before - self.subscriptions.len()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.subscriptions.iter().filter(|s| s.kind == kind).count()
    }

    /// Deliver `event` to every matching subscription.
    ///
    /// Closures run in place; widget and engine targets are handed to
    /// `route`. Returns the number of handlers that ran without error.
    pub fn emit(
        &mut self,
        event: &Event,
        route: &mut dyn FnMut(Route, &Event) -> Result<(), HandlerError>,
    ) -> usize {
        let kind = event.kind();
        let mut order: Vec<(i32, HandlerId)> = self
            .subscriptions
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| (s.priority, s.id))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut delivered = 0;
        for (_, id) in order {
            let Some(sub) = self.subscriptions.iter_mut().find(|s| s.id == id) else {
                continue;
            };
            if let Some(filter) = &sub.filter {
                if !filter(event) {
                    continue;
                }
            }
            let result = match &mut sub.target {
                Target::Callback(callback) => callback(event),
                Target::Widget(widget) => route(Route::Widget(*widget), event),
                Target::Engine => route(Route::Engine, event),
            };
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(%id, ?kind, source = ?event.source, "Event handler failed: {e}");
                }
            }
        }
        delivered
    }
}
