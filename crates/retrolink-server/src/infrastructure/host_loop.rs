//! The host-loop thread and the built-in demo machine.
//!
//! Production deployments bind [`retrolink_host::runtime::HostRuntime`] into
//! the emulator's own real-time loop by calling `process_frame` from its
//! vertical-sync point.  The standalone server binary has no emulator to
//! embed into, so it runs the same runtime on a plain OS thread at the
//! configured frame cadence against [`DemoMachine`], a minimal in-memory
//! stand-in that records input state and renders a flat frame.
//!
//! A plain `std::thread` (not a Tokio task) is deliberate: the host side is
//! synchronous by contract and must never touch the async runtime.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info};

use retrolink_core::{
    EventFrame, FeedError, FrameBuffer, JoyPort, JoystickValue, KeyCode, Machine, MatrixPos,
    ModifierMask,
};
use retrolink_host::bridge::PendingRequest;
use retrolink_host::runtime::HostRuntime;

use crate::infrastructure::broadcast::EventBroadcaster;

// VIC-II output size including borders.
const SCREEN_WIDTH: u32 = 384;
const SCREEN_HEIGHT: u32 = 272;

// The C64's KEYD buffer holds 10 characters.
const KEYBOARD_BUFFER_CAPACITY: usize = 10;

/// In-memory machine for the standalone server: tracks input state, queues
/// typed text, and emits one activity event per applied action.
pub struct DemoMachine {
    keyboard_buffer: Vec<char>,
    matrix: [[bool; 8]; 8],
    restore_pressed: bool,
    joystick: [JoystickValue; 2],
    events: Vec<EventFrame>,
}

impl DemoMachine {
    pub fn new() -> Self {
        DemoMachine {
            keyboard_buffer: Vec::new(),
            matrix: [[false; 8]; 8],
            restore_pressed: false,
            joystick: [JoystickValue::CENTER; 2],
            events: Vec::new(),
        }
    }

    /// Takes the activity events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<EventFrame> {
        std::mem::take(&mut self.events)
    }

    /// Consumes one character from the keyboard buffer per frame, the way
    /// the emulated KERNAL would.
    fn consume_buffered_char(&mut self) {
        if !self.keyboard_buffer.is_empty() {
            self.keyboard_buffer.remove(0);
        }
    }

    fn record(&mut self, kind: &str, data: serde_json::Value) {
        self.events.push(EventFrame {
            event: "machine_activity".into(),
            data: json!({"kind": kind, "detail": data}),
        });
    }
}

impl Default for DemoMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for DemoMachine {
    fn machine_name(&self) -> &str {
        "C64 (demo)"
    }

    fn feed_text(&mut self, text: &str) -> Result<(), FeedError> {
        if self.keyboard_buffer.len() + text.chars().count() > KEYBOARD_BUFFER_CAPACITY {
            return Err(FeedError::BufferFull);
        }
        self.keyboard_buffer.extend(text.chars());
        self.record("text_fed", json!({"length": text.chars().count()}));
        Ok(())
    }

    fn key_pressed(&mut self, code: KeyCode, modifiers: ModifierMask) {
        self.record(
            "key_pressed",
            json!({"key_code": code.0, "modifiers": modifiers.bits()}),
        );
    }

    fn key_released(&mut self, code: KeyCode, modifiers: ModifierMask) {
        self.record(
            "key_released",
            json!({"key_code": code.0, "modifiers": modifiers.bits()}),
        );
    }

    fn set_matrix_key(&mut self, pos: MatrixPos, pressed: bool) {
        self.matrix[pos.row as usize][pos.col as usize] = pressed;
        self.record(
            "matrix_set",
            json!({"row": pos.row, "col": pos.col, "pressed": pressed}),
        );
    }

    fn set_restore_key(&mut self, pressed: bool) {
        self.restore_pressed = pressed;
        self.record("restore_set", json!({"pressed": pressed}));
    }

    fn set_joystick(&mut self, port: JoyPort, value: JoystickValue) {
        self.joystick[(port.number() - 1) as usize] = value;
        self.record(
            "joystick_set",
            json!({"port": port.number(), "value": value.bits()}),
        );
    }

    fn frame_buffer(&self) -> FrameBuffer {
        // Light-blue border ring around a blue screen, the familiar power-on
        // palette (border colour 14, background 6).
        let mut pixels = vec![14u8; (SCREEN_WIDTH * SCREEN_HEIGHT) as usize];
        for y in 36..(SCREEN_HEIGHT - 36) {
            for x in 32..(SCREEN_WIDTH - 32) {
                pixels[(y * SCREEN_WIDTH + x) as usize] = 6;
            }
        }
        FrameBuffer {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            pixels,
        }
    }
}

/// Spawns the host-loop thread.
///
/// Runs until `running` is cleared and the request queue has closed, so
/// in-flight requests still get replies during shutdown.
pub fn spawn_host_loop(
    rx: Receiver<PendingRequest>,
    broadcaster: Arc<EventBroadcaster>,
    frame_interval: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("retrolink-host".into())
        .spawn(move || {
            info!(
                "host loop started ({}ms frame cadence)",
                frame_interval.as_millis()
            );
            let mut runtime = HostRuntime::new(rx);
            let mut machine = DemoMachine::new();

            loop {
                runtime.process_frame(&mut machine);
                machine.consume_buffered_char();

                for frame in machine.drain_events() {
                    broadcaster.broadcast(&frame);
                }

                if !running.load(Ordering::Relaxed) {
                    debug!("host loop shutdown flag set");
                    break;
                }
                std::thread::sleep(frame_interval);
            }

            // Final drain so shutdown never strands a queued request.
            runtime.process_frame(&mut machine);
            info!("host loop stopped");
        })
        .expect("failed to spawn host-loop thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_text_queues_characters() {
        let mut machine = DemoMachine::new();
        machine.feed_text("load\n").unwrap();
        assert_eq!(machine.keyboard_buffer.len(), 5);
    }

    #[test]
    fn test_feed_text_over_capacity_is_buffer_full() {
        let mut machine = DemoMachine::new();
        let err = machine.feed_text("12345678901").unwrap_err();
        assert_eq!(err, FeedError::BufferFull);
        // A refused feed queues nothing.
        assert!(machine.keyboard_buffer.is_empty());
    }

    #[test]
    fn test_buffer_drains_one_char_per_frame() {
        let mut machine = DemoMachine::new();
        machine.feed_text("run").unwrap();

        machine.consume_buffered_char();
        machine.consume_buffered_char();

        assert_eq!(machine.keyboard_buffer, vec!['n']);
    }

    #[test]
    fn test_matrix_state_tracks_last_set() {
        let mut machine = DemoMachine::new();
        let pos = MatrixPos { row: 7, col: 4 };
        machine.set_matrix_key(pos, true);
        assert!(machine.matrix[7][4]);
        machine.set_matrix_key(pos, false);
        assert!(!machine.matrix[7][4]);
    }

    #[test]
    fn test_every_action_emits_one_activity_event() {
        let mut machine = DemoMachine::new();
        machine.key_pressed(KeyCode(65), ModifierMask::NONE);
        machine.set_restore_key(true);
        machine.set_joystick(JoyPort::Port2, JoystickValue::FIRE);

        let events = machine.drain_events();

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.event == "machine_activity"));
        assert_eq!(events[0].data["kind"], "key_pressed");
        assert_eq!(events[2].data["detail"]["port"], 2);
    }

    #[test]
    fn test_drain_events_empties_the_queue() {
        let mut machine = DemoMachine::new();
        machine.set_restore_key(true);
        machine.drain_events();
        assert!(machine.drain_events().is_empty());
    }

    #[test]
    fn test_frame_buffer_has_border_and_background() {
        let machine = DemoMachine::new();
        let frame = machine.frame_buffer();

        assert_eq!(frame.width, 384);
        assert_eq!(frame.height, 272);
        assert_eq!(frame.pixels.len(), 384 * 272);
        // Top-left corner is border colour, centre is background colour.
        assert_eq!(frame.pixels[0], 14);
        let centre = (136 * 384 + 192) as usize;
        assert_eq!(frame.pixels[centre], 6);
    }
}
