//! What a widget may touch while it handles a callback.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use touch_proto::android::buttons;
use touch_proto::{ControlMessage, MotionAction, TouchEvent};

use crate::bus::{Event, EventData, Source};
use crate::geometry::{FrameSize, Point};
use crate::pointer::{PointerIdPool, PointerOwner};
use crate::timer::{TimerId, TimerQueue};
use crate::WidgetId;

/// Engine state shared by every widget callback.
#[derive(Debug)]
pub(crate) struct Runtime {
    pub(crate) pointers: PointerIdPool,
    pub(crate) timers: TimerQueue,
    pub(crate) outbox: VecDeque<Event>,
    pub(crate) frame: FrameSize,
    pub(crate) cursor: Point,
    pub(crate) now: Instant,
}

impl Runtime {
    pub(crate) fn new(frame: FrameSize, now: Instant) -> Self {
        Self {
            pointers: PointerIdPool::new(),
            timers: TimerQueue::new(),
            outbox: VecDeque::new(),
            frame,
            cursor: Point::default(),
            now,
        }
    }

    pub(crate) fn push(&mut self, source: Source, data: EventData) {
        self.outbox.push_back(Event::new(source, data));
    }

    /// Drain queued control messages, dropping every other event.
    #[cfg(test)]
    pub(crate) fn take_messages(&mut self) -> Vec<ControlMessage> {
        self.outbox
            .drain(..)
            .filter_map(|e| match e.data {
                EventData::ControlMessage(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Drain queued touch messages, dropping every other event.
    #[cfg(test)]
    pub(crate) fn take_touches(&mut self) -> Vec<TouchEvent> {
        self.take_messages()
            .into_iter()
            .filter_map(|msg| match msg {
                ControlMessage::InjectTouch(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

/// Handle passed to widget callbacks.
///
/// Everything a widget emits is queued and delivered by the engine after the
/// callback returns, in the order it was produced.
pub struct WidgetContext<'a> {
    id: WidgetId,
    rt: &'a mut Runtime,
}

impl<'a> WidgetContext<'a> {
    pub(crate) fn new(id: WidgetId, rt: &'a mut Runtime) -> Self {
        Self { id, rt }
    }

    #[must_use]
    pub fn id(&self) -> WidgetId {
        self.id
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.rt.now
    }

    #[must_use]
    pub fn frame(&self) -> FrameSize {
        self.rt.frame
    }

    /// Last known cursor position on the host frame.
    #[must_use]
    pub fn cursor(&self) -> Point {
        self.rt.cursor
    }

    pub fn allocate_pointer(&mut self) -> Option<u64> {
        self.rt.pointers.allocate(PointerOwner::Widget(self.id))
    }

    #[must_use]
    pub fn pointer(&self) -> Option<u64> {
        self.rt.pointers.get_allocated_id(&PointerOwner::Widget(self.id))
    }

    pub fn release_pointer(&mut self) -> bool {
        self.rt.pointers.release(&PointerOwner::Widget(self.id))
    }

    fn point_owner(&self, x: i32, y: i32) -> PointerOwner {
        PointerOwner::Point {
            widget: self.id,
            x,
            y,
        }
    }

    pub fn allocate_point_pointer(&mut self, x: i32, y: i32) -> Option<u64> {
        let owner = self.point_owner(x, y);
        self.rt.pointers.allocate(owner)
    }

    #[must_use]
    pub fn point_pointer(&self, x: i32, y: i32) -> Option<u64> {
        self.rt.pointers.get_allocated_id(&self.point_owner(x, y))
    }

    pub fn release_point_pointer(&mut self, x: i32, y: i32) -> bool {
        let owner = self.point_owner(x, y);
        self.rt.pointers.release(&owner)
    }

    pub fn emit(&mut self, data: EventData) {
        self.rt.push(Source::Widget(self.id), data);
    }

    pub fn touch(
        &mut self,
        action: MotionAction,
        pointer_id: u64,
        at: Point,
        pressure: f32,
        action_button: u32,
        buttons: u32,
    ) {
        let position = self.rt.frame.position(at);
        let event = TouchEvent::new(action, pointer_id, position, pressure, action_button, buttons);
        self.emit(EventData::ControlMessage(ControlMessage::InjectTouch(event)));
    }

    /// Finger down with full pressure and the primary button.
    pub fn finger_down(&mut self, pointer_id: u64, at: Point) {
        self.touch(MotionAction::Down, pointer_id, at, 1.0, buttons::PRIMARY, buttons::PRIMARY);
    }

    pub fn finger_move(&mut self, pointer_id: u64, at: Point) {
        self.touch(MotionAction::Move, pointer_id, at, 1.0, 0, buttons::PRIMARY);
    }

    pub fn finger_up(&mut self, pointer_id: u64, at: Point) {
        self.touch(MotionAction::Up, pointer_id, at, 0.0, buttons::PRIMARY, 0);
    }

    /// Touch of a steered finger: the primary button is named on every
    /// action and held until UP.
    pub fn stroke(&mut self, action: MotionAction, pointer_id: u64, at: Point) {
        let (pressure, held) = match action {
            MotionAction::Up => (0.0, 0),
            _ => (1.0, buttons::PRIMARY),
        };
        self.touch(action, pointer_id, at, pressure, buttons::PRIMARY, held);
    }

    /// Schedule [`Widget::on_timer`](super::Widget::on_timer) after `delay`.
    pub fn schedule(&mut self, delay: Duration) -> TimerId {
        let deadline = self.rt.now + delay;
        self.rt.timers.schedule(self.id, deadline)
    }

    pub fn cancel_timer(&mut self, timer: TimerId) -> bool {
        self.rt.timers.cancel(timer)
    }
}
