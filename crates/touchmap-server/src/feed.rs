//! Host input feed.
//!
//! The capturing front end writes one JSON object per line, for example
//! `{"type":"key_press","keyval":97,"state":0}` or
//! `{"type":"motion","x":640.0,"y":360.0}`.

use std::io;
use std::time::Instant;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use touch_engine::{Engine, FrameSize, InputEvent, Mode, Point};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    KeyPress {
        keyval: i32,
        #[serde(default)]
        state: u32,
    },
    KeyRelease {
        keyval: i32,
        #[serde(default)]
        state: u32,
    },
    ButtonPress {
        button: u32,
        x: f64,
        y: f64,
    },
    ButtonRelease {
        button: u32,
        x: f64,
        y: f64,
    },
    Motion {
        x: f64,
        y: f64,
    },
    RelativeMotion {
        dx: f64,
        dy: f64,
    },
    Scroll {
        dx: f64,
        dy: f64,
    },
    /// Switch between "mapping" and "edit".
    Mode {
        mode: String,
    },
    /// The host frame was resized.
    Frame {
        width: u16,
        height: u16,
    },
    /// Lift every finger.
    ReleaseAll,
}

impl HostEvent {
    /// Feed the event into `engine`.
    pub fn apply(self, engine: &mut Engine, now: Instant) {
        let input = match self {
            Self::KeyPress { keyval, state } => {
                InputEvent::key_press(engine.registry(), keyval, state)
            }
            Self::KeyRelease { keyval, state } => {
                InputEvent::key_release(engine.registry(), keyval, state)
            }
            Self::ButtonPress { button, x, y } => {
                InputEvent::button_press(engine.registry_mut(), button, Point::new(x, y))
            }
            Self::ButtonRelease { button, x, y } => {
                InputEvent::button_release(engine.registry_mut(), button, Point::new(x, y))
            }
            Self::Motion { x, y } => InputEvent::Motion {
                position: Point::new(x, y),
            },
            Self::RelativeMotion { dx, dy } => InputEvent::RelativeMotion { dx, dy },
            Self::Scroll { dx, dy } => InputEvent::Scroll { dx, dy },
            Self::Mode { mode } => {
                match mode.parse::<Mode>() {
                    Ok(mode) => engine.set_mode(mode),
                    Err(e) => tracing::warn!("{e}"),
                }
                return;
            }
            Self::Frame { width, height } => {
                engine.set_frame(FrameSize::new(width, height));
                return;
            }
            Self::ReleaseAll => {
                engine.release_all();
                return;
            }
        };
        engine.handle_input(&input, now);
    }
}

/// Reads raw feed lines without requiring them to be UTF-8.
///
/// A partly read line stays buffered, so [`next_line`](Self::next_line) may
/// be raced in `select!` and called again.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next line including its terminator, or `None` at end of input.
    pub async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.buf)))
    }
}

/// The line as text, or `None` (logged) when it is not valid UTF-8.
pub fn decode_line(bytes: &[u8]) -> Option<&str> {
    match std::str::from_utf8(bytes) {
        Ok(line) => Some(line),
        Err(e) => {
            tracing::warn!(len = bytes.len(), "Ignoring host input that is not UTF-8: {e}");
            None
        }
    }
}

/// Decode and apply one raw feed line.
pub fn apply_bytes(engine: &mut Engine, bytes: &[u8], now: Instant) {
    if let Some(line) = decode_line(bytes) {
        apply_line(engine, line, now);
    }
}

/// Parse one feed line and apply it. Blank lines are ignored and malformed
/// lines are logged.
pub fn apply_line(engine: &mut Engine, line: &str, now: Instant) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<HostEvent>(line) {
        Ok(event) => {
            tracing::trace!(?event, "Host input");
            event.apply(engine, now);
        }
        Err(e) => tracing::warn!(line, "Ignoring malformed host input: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use touch_engine::{EngineSettings, EventData, EventKind, Rect, WidgetSpec};
    use touch_keys::KeyCombination;
    use touch_proto::{ControlMessage, MotionAction};

    use super::*;

    #[test]
    fn parses_tagged_lines() {
        let event: HostEvent =
            serde_json::from_str(r#"{"type":"key_press","keyval":97}"#).unwrap();
        assert_eq!(event, HostEvent::KeyPress { keyval: 97, state: 0 });

        let event: HostEvent =
            serde_json::from_str(r#"{"type":"button_release","button":3,"x":1,"y":2.5}"#)
                .unwrap();
        assert_eq!(
            event,
            HostEvent::ButtonRelease {
                button: 3,
                x: 1.0,
                y: 2.5
            }
        );

        let event: HostEvent = serde_json::from_str(r#"{"type":"release_all"}"#).unwrap();
        assert_eq!(event, HostEvent::ReleaseAll);
        assert!(serde_json::from_str::<HostEvent>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn drives_the_engine() {
        let now = Instant::now();
        let mut engine = Engine::with_clock(EngineSettings::default(), now);
        let sent = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sent);
        engine.on(EventKind::ControlMessage, move |event| {
            if let EventData::ControlMessage(ControlMessage::InjectTouch(t)) = &event.data {
                sink.borrow_mut().push(t.action);
            }
            Ok(())
        });
        let key = KeyCombination::parse("Mouse_Left", engine.registry_mut()).unwrap();
        engine.attach_spec(WidgetSpec::SingleClick {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            key,
        });

        apply_line(&mut engine, "", now);
        apply_line(&mut engine, "not json", now);
        apply_line(&mut engine, r#"{"type":"button_press","button":1,"x":5,"y":5}"#, now);
        apply_line(&mut engine, r#"{"type":"release_all"}"#, now);
        apply_line(&mut engine, r#"{"type":"mode","mode":"edit"}"#, now);
        apply_line(&mut engine, r#"{"type":"mode","mode":"sideways"}"#, now);
        apply_line(&mut engine, r#"{"type":"frame","width":800,"height":600}"#, now);

        assert_eq!(*sent.borrow(), [MotionAction::Down, MotionAction::Up]);
        assert_eq!(engine.mode(), Mode::Edit);
        assert_eq!(engine.frame(), FrameSize::new(800, 600));
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let input = [
            &br#"{"type":"mode","mode":"edit"}"#[..],
            &b"\n\xff\xfe garbage\n"[..],
            &br#"{"type":"frame","width":640,"height":480}"#[..],
        ]
        .concat();
        let mut reader = LineReader::new(input.as_slice());
        let mut engine = Engine::with_clock(EngineSettings::default(), Instant::now());

        let mut lines = 0;
        while let Some(line) = reader.next_line().await.unwrap() {
            lines += 1;
            apply_bytes(&mut engine, &line, Instant::now());
        }

        assert_eq!(lines, 3);
        assert_eq!(engine.mode(), Mode::Edit);
        assert_eq!(engine.frame(), FrameSize::new(640, 480));
        assert!(decode_line(b"\xc3(").is_none());
        assert_eq!(decode_line("h\u{e9}\n".as_bytes()), Some("h\u{e9}\n"));
    }
}
