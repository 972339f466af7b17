//! The mapping engine: widgets, key mappings, the bus and the handler chain
//! behind one owned value.
//!
//! The engine is synchronous. Host input goes in through
//! [`Engine::handle_input`], timers are driven by [`Engine::advance`], and
//! wire messages come out as `ControlMessage` events on the bus.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use touch_keys::{Key, KeyCombination, KeyRegistry};

use crate::bus::{Event, EventBus, EventData, EventKind, HandlerId, Route, Source, Subscriber, Target};
use crate::error::HandlerError;
use crate::geometry::{FrameSize, Point};
use crate::handler::{
    DefaultKeyHandler, DefaultMouseHandler, HandlerChain, InputHandler, InputSettings,
    KeyMappingHandler, MotionRelayHandler,
};
use crate::input::InputEvent;
use crate::mapping::{KeyMappingManager, KeySubscription, MappingDispatch};
use crate::pointer::PoolStatus;
use crate::widget::{Runtime, UnknownName, Widget, WidgetContext, WidgetId, WidgetSpec};

/// Events the engine itself reacts to.
const ENGINE_EVENTS: &[EventKind] = &[
    EventKind::ModeChanged,
    EventKind::AimTriggered,
    EventKind::AimReleased,
    EventKind::MacroKeyPressed,
    EventKind::MacroKeyReleased,
    EventKind::MacroReleaseAll,
    EventKind::CreateWidget,
    EventKind::DeleteWidget,
];

/// Bus priority of the engine's own subscriptions.
const ENGINE_PRIORITY: i32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Keys drive widgets.
    #[default]
    Mapping,
    /// Layout editing; mappings are inert.
    Edit,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapping => f.write_str("mapping"),
            Self::Edit => f.write_str("edit"),
        }
    }
}

impl FromStr for Mode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mapping" => Ok(Self::Mapping),
            "edit" => Ok(Self::Edit),
            other => Err(UnknownName::new("mode", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub frame: FrameSize,
    pub input: InputSettings,
}

enum PendingOp {
    Create(WidgetSpec),
    Delete(WidgetId),
}

/// Calls into widgets on behalf of the mapping manager.
struct Dispatcher<'a> {
    widgets: &'a mut BTreeMap<WidgetId, Box<dyn Widget>>,
    rt: &'a mut Runtime,
}

impl MappingDispatch for Dispatcher<'_> {
    fn trigger(&mut self, widget: WidgetId, combination: &KeyCombination) -> bool {
        let Some(w) = self.widgets.get_mut(&widget) else {
            tracing::warn!(%widget, "Trigger for unknown widget");
            return false;
        };
        w.on_trigger(combination, &mut WidgetContext::new(widget, self.rt))
    }

    fn release(&mut self, widget: WidgetId, combination: &KeyCombination) -> bool {
        let Some(w) = self.widgets.get_mut(&widget) else {
            return false;
        };
        w.on_release(combination, &mut WidgetContext::new(widget, self.rt))
    }
}

/// State reachable from bus routes and widget callbacks.
struct World {
    registry: KeyRegistry,
    mapping: KeyMappingManager,
    widgets: BTreeMap<WidgetId, Box<dyn Widget>>,
    rt: Runtime,
    mode: Mode,
    aiming: HashSet<WidgetId>,
    pending: Vec<PendingOp>,
    next_widget: u64,
}

impl World {
    fn dispatcher(&mut self) -> (&mut KeyMappingManager, Dispatcher<'_>) {
        (
            &mut self.mapping,
            Dispatcher {
                widgets: &mut self.widgets,
                rt: &mut self.rt,
            },
        )
    }

    fn press_key(&mut self, key: Key) -> bool {
        let (mapping, mut dispatch) = self.dispatcher();
        mapping.handle_press(key, &mut dispatch)
    }

    fn release_key(&mut self, key: &Key) -> bool {
        let (mapping, mut dispatch) = self.dispatcher();
        mapping.handle_release(key, &mut dispatch)
    }

    fn release_all(&mut self) -> bool {
        let (mapping, mut dispatch) = self.dispatcher();
        mapping.release_all(&mut dispatch)
    }

    fn apply_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        tracing::info!(from = %self.mode, to = %mode, "Mode changed");
        self.mode = mode;
        if mode == Mode::Edit {
            self.release_all();
        }
    }

    fn route(&mut self, route: Route, event: &Event) -> Result<(), HandlerError> {
        match route {
            Route::Widget(id) => {
                let widget = self
                    .widgets
                    .get_mut(&id)
                    .ok_or(HandlerError::UnknownWidget(id))?;
                widget.on_event(event, &mut WidgetContext::new(id, &mut self.rt));
            }
            Route::Engine => match &event.data {
                EventData::ModeChanged(mode) => self.apply_mode(*mode),
                EventData::MacroKeyPressed(key) => {
                    self.press_key(key.clone());
                }
                EventData::MacroKeyReleased(key) => {
                    self.release_key(key);
                }
                EventData::MacroReleaseAll => {
                    self.release_all();
                }
                EventData::CreateWidget(spec) => self.pending.push(PendingOp::Create(spec.clone())),
                EventData::DeleteWidget(id) => self.pending.push(PendingOp::Delete(*id)),
                EventData::AimTriggered => {
                    if let Source::Widget(id) = event.source {
                        self.aiming.insert(id);
                    }
                }
                EventData::AimReleased => {
                    if let Source::Widget(id) = event.source {
                        self.aiming.remove(&id);
                    }
                }
                _ => {}
            },
        }
        Ok(())
    }
}

/// Engine state handed to input handlers.
pub struct Core {
    bus: EventBus,
    world: World,
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("mode", &self.world.mode)
            .field("widgets", &self.world.widgets.len())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl Core {
    pub(crate) fn new(frame: FrameSize, now: Instant) -> Self {
        let mut bus = EventBus::new();
        for kind in ENGINE_EVENTS {
            bus.subscribe(*kind, Target::Engine, None, ENGINE_PRIORITY, Some(Subscriber::Engine));
        }
        Self {
            bus,
            world: World {
                registry: KeyRegistry::new(),
                mapping: KeyMappingManager::new(),
                widgets: BTreeMap::new(),
                rt: Runtime::new(frame, now),
                mode: Mode::Mapping,
                aiming: HashSet::new(),
                pending: Vec::new(),
                next_widget: 0,
            },
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.world.mode
    }

    /// Whether an aim widget has captured the pointer.
    #[must_use]
    pub fn pointer_locked(&self) -> bool {
        !self.world.aiming.is_empty()
    }

    #[must_use]
    pub fn frame(&self) -> FrameSize {
        self.world.rt.frame
    }

    #[must_use]
    pub fn cursor(&self) -> Point {
        self.world.rt.cursor
    }

    pub fn set_cursor(&mut self, position: Point) {
        self.world.rt.cursor = position;
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.world.rt.now
    }

    #[must_use]
    pub fn registry(&self) -> &KeyRegistry {
        &self.world.registry
    }

    pub fn registry_mut(&mut self) -> &mut KeyRegistry {
        &mut self.world.registry
    }

    #[must_use]
    pub fn mapping(&self) -> &KeyMappingManager {
        &self.world.mapping
    }

    #[must_use]
    pub fn pointer_status(&self) -> PoolStatus {
        self.world.rt.pointers.status()
    }

    /// Queue an event for delivery once the current input is processed.
    pub fn emit(&mut self, source: Source, data: EventData) {
        self.world.rt.push(source, data);
    }

    /// Feed a key press into the mapping manager. Returns whether it was consumed.
    pub fn press_key(&mut self, key: Key) -> bool {
        self.world.press_key(key)
    }

    pub fn release_key(&mut self, key: &Key) -> bool {
        self.world.release_key(key)
    }

    pub fn release_all(&mut self) -> bool {
        self.world.release_all()
    }

    #[cfg(test)]
    pub(crate) fn drain_messages(&mut self) -> Vec<touch_proto::ControlMessage> {
        self.world.rt.take_messages()
    }

    fn attach(&mut self, widget: Box<dyn Widget>) -> WidgetId {
        let world = &mut self.world;
        world.next_widget += 1;
        let id = WidgetId(world.next_widget);

        for binding in widget.bindings() {
            world
                .mapping
                .subscribe(KeySubscription::new(id, binding.combination, binding.reentrant));
        }
        for kind in widget.event_interests() {
            self.bus.subscribe(*kind, Target::Widget(id), None, 0, Some(Subscriber::Widget(id)));
        }
        tracing::info!(widget = %id, kind = %widget.kind(), rect = ?widget.rect(), "Widget attached");
        world.widgets.insert(id, widget);
        id
    }

    fn detach(&mut self, id: WidgetId) -> bool {
        let world = &mut self.world;
        let Some(mut widget) = world.widgets.remove(&id) else {
            tracing::warn!(widget = %id, "Detach of unknown widget");
            return false;
        };
        widget.on_detach(&mut WidgetContext::new(id, &mut world.rt));
        world.mapping.unsubscribe(id);
        world.rt.timers.cancel_widget(id);
        world.rt.pointers.release_widget(id);
        world.aiming.remove(&id);
        self.bus.unsubscribe_by_subscriber(&Subscriber::Widget(id));
        tracing::info!(widget = %id, kind = %widget.kind(), "Widget detached");
        true
    }

    /// Deliver queued events, then apply widget creation and deletion they
    /// requested, until nothing is left.
    fn flush(&mut self) {
        loop {
            while let Some(event) = self.world.rt.outbox.pop_front() {
                let world = &mut self.world;
                self.bus.emit(&event, &mut |route, event| world.route(route, event));
            }

            let pending = std::mem::take(&mut self.world.pending);
            if pending.is_empty() {
                break;
            }
            for op in pending {
                match op {
                    PendingOp::Create(spec) => {
                        self.attach(spec.build());
                    }
                    PendingOp::Delete(id) => {
                        self.detach(id);
                    }
                }
            }
        }
    }
}

/// Owned input mapping engine.
pub struct Engine {
    core: Core,
    chain: HandlerChain,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("core", &self.core)
            .field("chain", &self.chain)
            .finish()
    }
}

impl Engine {
    /// Create an engine with the default handler chain.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_clock(settings, Instant::now())
    }

    /// Create an engine whose clock starts at `now`.
    #[must_use]
    pub fn with_clock(settings: EngineSettings, now: Instant) -> Self {
        let mut chain = HandlerChain::new();
        chain.add(Box::new(MotionRelayHandler::new()));
        chain.add(Box::new(KeyMappingHandler::new()));
        chain.add(Box::new(DefaultMouseHandler::new(&settings.input)));
        chain.add(Box::new(DefaultKeyHandler::new(&settings.input)));
        tracing::info!(
            width = settings.frame.width,
            height = settings.frame.height,
            "Input mapping engine created"
        );
        Self {
            core: Core::new(settings.frame, now),
            chain,
        }
    }

    #[must_use]
    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    pub fn chain_mut(&mut self) -> &mut HandlerChain {
        &mut self.chain
    }

    pub fn add_handler(&mut self, handler: Box<dyn InputHandler>) {
        self.chain.add(handler);
    }

    #[must_use]
    pub fn registry(&self) -> &KeyRegistry {
        self.core.registry()
    }

    pub fn registry_mut(&mut self) -> &mut KeyRegistry {
        self.core.registry_mut()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.core.mode()
    }

    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.core.world.widgets.len()
    }

    #[must_use]
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        self.core.world.widgets.keys().copied().collect()
    }

    #[must_use]
    pub fn widget(&self, id: WidgetId) -> Option<&dyn Widget> {
        self.core.world.widgets.get(&id).map(|w| &**w)
    }

    /// Take ownership of a widget and subscribe its bindings.
    pub fn attach(&mut self, widget: Box<dyn Widget>) -> WidgetId {
        let id = self.core.attach(widget);
        self.core.flush();
        id
    }

    /// Build and attach a widget from its description.
    pub fn attach_spec(&mut self, spec: WidgetSpec) -> WidgetId {
        self.attach(spec.build())
    }

    /// Destroy a widget, lifting any finger it holds.
    pub fn detach(&mut self, id: WidgetId) -> bool {
        let removed = self.core.detach(id);
        self.core.flush();
        removed
    }

    /// Subscribe to bus events.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        target: Target,
        filter: Option<crate::bus::Filter>,
        priority: i32,
        subscriber: Option<Subscriber>,
    ) -> HandlerId {
        self.core.bus.subscribe(kind, target, filter, priority, subscriber)
    }

    /// Subscribe a closure to one event kind.
    pub fn on(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&Event) -> Result<(), HandlerError> + 'static,
    ) -> HandlerId {
        self.core.bus.on(kind, callback)
    }

    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        self.core.bus.unsubscribe(id)
    }

    /// Publish an event and deliver everything it causes.
    pub fn emit(&mut self, source: Source, data: EventData) {
        self.core.emit(source, data);
        self.core.flush();
    }

    /// Release every active mapping and deliver the resulting touches.
    pub fn release_all(&mut self) -> bool {
        let released = self.core.release_all();
        self.core.flush();
        released
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.emit(Source::Engine, EventData::ModeChanged(mode));
    }

    pub fn set_frame(&mut self, frame: FrameSize) {
        tracing::debug!(width = frame.width, height = frame.height, "Frame resized");
        self.core.world.rt.frame = frame;
    }

    #[must_use]
    pub fn frame(&self) -> FrameSize {
        self.core.frame()
    }

    /// Earliest pending widget timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.core.world.rt.timers.next_deadline()
    }

    /// Fire every timer due at `now`, in deadline order.
    pub fn advance(&mut self, now: Instant) {
        loop {
            let world = &mut self.core.world;
            let Some((timer, id, deadline)) = world.rt.timers.pop_due(now) else {
                break;
            };
            world.rt.now = deadline;
            match world.widgets.get_mut(&id) {
                Some(widget) => widget.on_timer(timer, &mut WidgetContext::new(id, &mut world.rt)),
                None => tracing::debug!(widget = %id, "Timer for detached widget dropped"),
            }
            self.core.flush();
        }
        if now > self.core.world.rt.now {
            self.core.world.rt.now = now;
        }
    }

    /// Process one host event at `now`. Returns whether it was consumed.
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) -> bool {
        self.advance(now);
        let consumed = self.chain.dispatch(event, &mut self.core);
        self.core.flush();
        consumed
    }

    /// Convenience: key press by host keyval and modifier state.
    pub fn key_press(&mut self, keyval: i32, state: u32, now: Instant) -> bool {
        let event = InputEvent::key_press(self.registry(), keyval, state);
        self.handle_input(&event, now)
    }

    pub fn key_release(&mut self, keyval: i32, state: u32, now: Instant) -> bool {
        let event = InputEvent::key_release(self.registry(), keyval, state);
        self.handle_input(&event, now)
    }

    pub fn button_press(&mut self, button: u32, position: Point, now: Instant) -> bool {
        let event = InputEvent::button_press(self.registry_mut(), button, position);
        self.handle_input(&event, now)
    }

    pub fn button_release(&mut self, button: u32, position: Point, now: Instant) -> bool {
        let event = InputEvent::button_release(self.registry_mut(), button, position);
        self.handle_input(&event, now)
    }

    /// Log subscriptions, pressed keys and pointer usage at debug level.
    pub fn log_state(&self) {
        self.core.world.mapping.log_state();
        let status = self.core.world.rt.pointers.status();
        tracing::debug!(
            mode = %self.core.world.mode,
            widgets = self.core.world.widgets.len(),
            pointers = ?status.allocated,
            "Engine state"
        );
    }
}
