//! Scripted macros.
//!
//! A script is a list of commands, one per line. Everything after a
//! `release_actions` line runs when the key is released; the rest runs on
//! press. Lines starting with `#` are ignored.
//!
//! ```text
//! key_press Shift_L,W
//! sleep 300
//! click 960,540 mouse
//! release_actions
//! key_release Shift_L,W
//! ```

use std::time::Duration;

use touch_keys::{Key, KeyCombination, KeyRegistry};
use touch_proto::android::buttons;
use touch_proto::MotionAction;

use super::{single_binding, Binding, Widget, WidgetContext, WidgetKind};
use crate::bus::{Event, EventData, EventKind, Source};
use crate::geometry::{Point, Rect};
use crate::timer::TimerId;

/// Hold time between the down and up halves of `click`.
const CLICK_HOLD: Duration = Duration::from_millis(50);

/// Pointer slot used for `mouse` coordinates.
const CURSOR_SLOT: (i32, i32) = (-1, -1);

/// Where a scripted touch lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroPoint {
    /// The host cursor at the time the command runs.
    Cursor,
    At(i32, i32),
}

impl MacroPoint {
    fn parse(text: &str) -> Option<Self> {
        if text == "mouse" {
            return Some(Self::Cursor);
        }
        let (x, y) = text.split_once(',')?;
        Some(Self::At(x.trim().parse().ok()?, y.trim().parse().ok()?))
    }

    fn slot(self) -> (i32, i32) {
        match self {
            Self::Cursor => CURSOR_SLOT,
            Self::At(x, y) => (x, y),
        }
    }

    fn resolve(self, cursor: Point) -> Point {
        match self {
            Self::Cursor => cursor,
            Self::At(x, y) => Point::new(f64::from(x), f64::from(y)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MacroCommand {
    KeyPress(Vec<Key>),
    KeyRelease(Vec<Key>),
    Press(Vec<MacroPoint>),
    Release(Vec<MacroPoint>),
    Click(Vec<MacroPoint>),
    Sleep(Duration),
    ReleaseAll,
}

impl MacroCommand {
    /// Parse one script line. Unknown or malformed commands are logged and
    /// skipped.
    pub fn parse(line: &str, registry: &mut KeyRegistry) -> Option<Self> {
        let (name, args) = line.split_once(' ').unwrap_or((line, ""));
        let name = name.to_ascii_lowercase();
        let args = args.trim();

        let command = match name.as_str() {
            "key_press" | "key_release" => {
                let keys: Vec<Key> = args
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(|k| registry.deserialize(k))
                    .collect();
                if keys.is_empty() {
                    None
                } else if name == "key_press" {
                    Some(Self::KeyPress(keys))
                } else {
                    Some(Self::KeyRelease(keys))
                }
            }
            "press" | "release" | "click" => {
                let points: Option<Vec<MacroPoint>> =
                    args.split_whitespace().map(MacroPoint::parse).collect();
                match points {
                    Some(points) if !points.is_empty() => Some(match name.as_str() {
                        "press" => Self::Press(points),
                        "release" => Self::Release(points),
                        _ => Self::Click(points),
                    }),
                    _ => None,
                }
            }
            "sleep" => match args.parse::<u64>() {
                Ok(ms) if ms > 0 => Some(Self::Sleep(Duration::from_millis(ms))),
                _ => None,
            },
            "release_all" => Some(Self::ReleaseAll),
            _ => {
                tracing::warn!(command = %name, "Unknown macro command");
                return None;
            }
        };

        if command.is_none() {
            tracing::warn!(command = %name, args, "Invalid macro command arguments");
        }
        command
    }
}

/// Press and release halves of a macro.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroScript {
    pub press: Vec<MacroCommand>,
    pub release: Vec<MacroCommand>,
}

impl MacroScript {
    #[must_use]
    pub fn parse(text: &str, registry: &mut KeyRegistry) -> Self {
        let (press, release) = text.split_once("release_actions").unwrap_or((text, ""));
        Self {
            press: parse_lines(press, registry),
            release: parse_lines(release, registry),
        }
    }

    fn commands(&self) -> impl Iterator<Item = &MacroCommand> {
        self.press.iter().chain(&self.release)
    }
}

fn parse_lines(text: &str, registry: &mut KeyRegistry) -> Vec<MacroCommand> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| MacroCommand::parse(line, registry))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Press,
    Release,
}

#[derive(Debug, Clone)]
struct Run {
    phase: Phase,
    next: usize,
    timer: Option<TimerId>,
    /// Points of a `click` waiting for their up half.
    click: Vec<MacroPoint>,
}

/// Runs a command script when its key is pressed and released.
#[derive(Debug, Clone)]
pub struct Macro {
    rect: Rect,
    key: KeyCombination,
    script: MacroScript,
    run: Option<Run>,
}

impl Macro {
    #[must_use]
    pub fn new(rect: Rect, key: KeyCombination, script: MacroScript) -> Self {
        Self {
            rect,
            key,
            script,
            run: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    fn start(&mut self, phase: Phase, ctx: &mut WidgetContext<'_>) {
        tracing::debug!(widget = %ctx.id(), ?phase, "Macro started");
        self.run = Some(Run {
            phase,
            next: 0,
            timer: None,
            click: Vec::new(),
        });
        self.resume(ctx);
    }

    /// Execute commands until the script ends or waits on a timer.
    fn resume(&mut self, ctx: &mut WidgetContext<'_>) {
        while let Some(run) = self.run.as_mut() {
            let commands = match run.phase {
                Phase::Press => &self.script.press,
                Phase::Release => &self.script.release,
            };
            let Some(command) = commands.get(run.next).cloned() else {
                tracing::debug!(widget = %ctx.id(), phase = ?run.phase, "Macro finished");
                self.run = None;
                return;
            };
            run.next += 1;

            match command {
                MacroCommand::KeyPress(keys) => {
                    for key in keys {
                        ctx.emit(EventData::MacroKeyPressed(key));
                    }
                }
                MacroCommand::KeyRelease(keys) => {
                    for key in keys {
                        ctx.emit(EventData::MacroKeyReleased(key));
                    }
                }
                MacroCommand::Press(points) => press_points(&points, ctx),
                MacroCommand::Release(points) => release_points(&points, ctx),
                MacroCommand::Click(points) => {
                    press_points(&points, ctx);
                    run.click = points;
                    run.timer = Some(ctx.schedule(CLICK_HOLD));
                    return;
                }
                MacroCommand::Sleep(delay) => {
                    run.timer = Some(ctx.schedule(delay));
                    return;
                }
                MacroCommand::ReleaseAll => ctx.emit(EventData::MacroReleaseAll),
            }
        }
    }

    /// Abort the running script, lifting the fingers of an unfinished click.
    fn cancel(&mut self, ctx: &mut WidgetContext<'_>) {
        if let Some(run) = self.run.take() {
            if let Some(timer) = run.timer {
                ctx.cancel_timer(timer);
            }
            release_points(&run.click, ctx);
            tracing::debug!(widget = %ctx.id(), phase = ?run.phase, "Macro cancelled");
        }
    }

    /// Undo whatever the script may have left held.
    fn release_everything(&mut self, ctx: &mut WidgetContext<'_>) {
        self.cancel(ctx);
        for command in self.script.commands() {
            match command {
                MacroCommand::KeyPress(keys) => {
                    for key in keys {
                        ctx.emit(EventData::MacroKeyReleased(key.clone()));
                    }
                }
                MacroCommand::Press(points) | MacroCommand::Click(points) => {
                    release_points(points, ctx);
                }
                _ => {}
            }
        }
    }
}

fn press_points(points: &[MacroPoint], ctx: &mut WidgetContext<'_>) {
    for point in points {
        let (x, y) = point.slot();
        let Some(pointer) = ctx.allocate_point_pointer(x, y) else {
            tracing::warn!(widget = %ctx.id(), ?point, "No free pointer id for macro press");
            return;
        };
        let at = point.resolve(ctx.cursor());
        ctx.touch(MotionAction::Down, pointer, at, 1.0, buttons::PRIMARY, buttons::PRIMARY);
    }
}

fn release_points(points: &[MacroPoint], ctx: &mut WidgetContext<'_>) {
    for point in points {
        let (x, y) = point.slot();
        let Some(pointer) = ctx.point_pointer(x, y) else {
            continue;
        };
        let at = point.resolve(ctx.cursor());
        ctx.touch(MotionAction::Up, pointer, at, 0.0, buttons::PRIMARY, 0);
        ctx.release_point_pointer(x, y);
    }
}

impl Widget for Macro {
    fn kind(&self) -> WidgetKind {
        WidgetKind::Macro
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn bindings(&self) -> Vec<Binding> {
        single_binding(&self.key, false)
    }

    fn event_interests(&self) -> &'static [EventKind] {
        &[EventKind::MacroReleaseAll]
    }

    fn on_trigger(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        if self.is_running() {
            return true;
        }
        if !self.script.press.is_empty() {
            self.start(Phase::Press, ctx);
        }
        true
    }

    fn on_release(&mut self, _combination: &KeyCombination, ctx: &mut WidgetContext<'_>) -> bool {
        if self.script.release.is_empty() {
            return true;
        }
        self.cancel(ctx);
        self.start(Phase::Release, ctx);
        true
    }

    fn on_timer(&mut self, timer: TimerId, ctx: &mut WidgetContext<'_>) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.timer != Some(timer) {
            return;
        }
        run.timer = None;
        let click = std::mem::take(&mut run.click);
        release_points(&click, ctx);
        self.resume(ctx);
    }

    fn on_event(&mut self, event: &Event, ctx: &mut WidgetContext<'_>) {
        // A script's own release_all must not abort the script.
        if matches!(event.data, EventData::MacroReleaseAll) && event.source != Source::Widget(ctx.id()) {
            self.release_everything(ctx);
        }
    }

    fn on_detach(&mut self, ctx: &mut WidgetContext<'_>) {
        self.release_everything(ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use touch_proto::ControlMessage;

    use super::*;
    use crate::geometry::FrameSize;
    use crate::widget::Runtime;
    use crate::WidgetId;

    const ID: WidgetId = WidgetId(12);

    fn drain(rt: &mut Runtime) -> Vec<String> {
        rt.outbox
            .drain(..)
            .map(|e| match e.data {
                EventData::ControlMessage(ControlMessage::InjectTouch(t)) => {
                    format!("{} {} {},{}", t.action, t.pointer_id, t.position.x, t.position.y)
                }
                EventData::MacroKeyPressed(k) => format!("press {k}"),
                EventData::MacroKeyReleased(k) => format!("release {k}"),
                other => format!("{:?}", other.kind()),
            })
            .collect()
    }

    fn advance(widget: &mut Macro, rt: &mut Runtime, to: Instant) {
        while let Some((timer, _, deadline)) = rt.timers.pop_due(to) {
            rt.now = deadline;
            widget.on_timer(timer, &mut WidgetContext::new(ID, rt));
        }
        rt.now = to;
    }

    #[test]
    fn parses_script_halves() {
        let mut registry = KeyRegistry::new();
        let script = MacroScript::parse(
            "# open map\nkey_press Shift_L, M\nsleep 120\nclick 10,20 mouse\nbogus 1\nsleep -3\n\
             release_actions\nkey_release M\nrelease_all",
            &mut registry,
        );

        assert_eq!(script.press.len(), 3);
        assert_eq!(script.press[1], MacroCommand::Sleep(Duration::from_millis(120)));
        assert_eq!(
            script.press[2],
            MacroCommand::Click(vec![MacroPoint::At(10, 20), MacroPoint::Cursor])
        );
        assert_eq!(script.release.len(), 2);
        assert_eq!(script.release[1], MacroCommand::ReleaseAll);
        assert!(MacroCommand::parse("press 1;2", &mut registry).is_none());
    }

    #[test]
    fn runs_with_sleep_and_click() {
        let mut registry = KeyRegistry::new();
        let script = MacroScript::parse(
            "key_press W\nsleep 100\nclick 300,400\nkey_release W\nrelease_actions\npress mouse",
            &mut registry,
        );
        let key = KeyCombination::parse("F", &mut registry).unwrap();
        let mut widget = Macro::new(Rect::new(0.0, 0.0, 40.0, 40.0), key.clone(), script);
        let t0 = Instant::now();
        let mut rt = Runtime::new(FrameSize::default(), t0);
        rt.cursor = Point::new(640.0, 360.0);

        assert!(widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt)));
        assert_eq!(drain(&mut rt), ["press W"]);
        // Pressing again while the script runs is absorbed.
        widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        assert!(rt.outbox.is_empty());

        advance(&mut widget, &mut rt, t0 + Duration::from_millis(100));
        assert_eq!(drain(&mut rt), ["DOWN 1 300,400"]);
        advance(&mut widget, &mut rt, t0 + Duration::from_millis(150));
        assert_eq!(drain(&mut rt), ["UP 1 300,400", "release W"]);
        assert!(!widget.is_running());

        widget.on_release(&key, &mut WidgetContext::new(ID, &mut rt));
        assert_eq!(drain(&mut rt), ["DOWN 1 640,360"]);
        assert_eq!(rt.pointers.active(), 1);
    }

    #[test]
    fn release_all_from_elsewhere_undoes_everything() {
        let mut registry = KeyRegistry::new();
        let script = MacroScript::parse("key_press W\npress 5,5\nsleep 1000\nrelease_all", &mut registry);
        let key = KeyCombination::parse("F", &mut registry).unwrap();
        let mut widget = Macro::new(Rect::default(), key.clone(), script);
        let mut rt = Runtime::new(FrameSize::default(), Instant::now());

        widget.on_trigger(&key, &mut WidgetContext::new(ID, &mut rt));
        drain(&mut rt);

        let own = Event::new(Source::Widget(ID), EventData::MacroReleaseAll);
        widget.on_event(&own, &mut WidgetContext::new(ID, &mut rt));
        assert!(widget.is_running());

        let other = Event::new(Source::Widget(WidgetId(1)), EventData::MacroReleaseAll);
        widget.on_event(&other, &mut WidgetContext::new(ID, &mut rt));
        assert!(!widget.is_running());
        assert!(rt.timers.is_empty());
        assert_eq!(drain(&mut rt), ["release W", "UP 1 5,5"]);
        assert_eq!(rt.pointers.active(), 0);
    }
}
