//! Test double for the emulator seam.
//!
//! [`MockMachine`] records every primitive call in order so tests can assert
//! on exact sequences, and exposes a couple of failure knobs (feed refusal,
//! frame-buffer panic) for exercising the error paths.  It lives in the
//! library (not behind `cfg(test)`) so integration tests and the server
//! crate's tests can use it too.

use retrolink_core::{
    FeedError, FrameBuffer, JoyPort, JoystickValue, KeyCode, Machine, MatrixPos, ModifierMask,
};

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineCall {
    FeedText(String),
    KeyPressed(KeyCode, ModifierMask),
    KeyReleased(KeyCode, ModifierMask),
    MatrixSet(MatrixPos, bool),
    RestoreSet(bool),
    JoystickSet(JoyPort, JoystickValue),
}

/// Recording mock of [`Machine`].
pub struct MockMachine {
    /// Every call, in order of arrival.
    pub calls: Vec<MachineCall>,
    /// Live matrix state, so tests can assert a key is still held.
    pub matrix: [[bool; 8]; 8],
    /// Result the next `feed_text` returns.
    pub feed_result: Result<(), FeedError>,
    /// When set, `frame_buffer` panics.  Used to verify the host runtime
    /// converts handler faults instead of dying.
    pub panic_on_frame_buffer: bool,
}

impl MockMachine {
    pub fn new() -> Self {
        MockMachine {
            calls: Vec::new(),
            matrix: [[false; 8]; 8],
            feed_result: Ok(()),
            panic_on_frame_buffer: false,
        }
    }

    /// Convenience: is the matrix switch at `pos` currently pressed?
    pub fn matrix_pressed(&self, pos: MatrixPos) -> bool {
        self.matrix[pos.row as usize][pos.col as usize]
    }
}

impl Default for MockMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for MockMachine {
    fn machine_name(&self) -> &str {
        "MockC64"
    }

    fn feed_text(&mut self, text: &str) -> Result<(), FeedError> {
        self.calls.push(MachineCall::FeedText(text.to_string()));
        self.feed_result.clone()
    }

    fn key_pressed(&mut self, code: KeyCode, modifiers: ModifierMask) {
        self.calls.push(MachineCall::KeyPressed(code, modifiers));
    }

    fn key_released(&mut self, code: KeyCode, modifiers: ModifierMask) {
        self.calls.push(MachineCall::KeyReleased(code, modifiers));
    }

    fn set_matrix_key(&mut self, pos: MatrixPos, pressed: bool) {
        self.matrix[pos.row as usize][pos.col as usize] = pressed;
        self.calls.push(MachineCall::MatrixSet(pos, pressed));
    }

    fn set_restore_key(&mut self, pressed: bool) {
        self.calls.push(MachineCall::RestoreSet(pressed));
    }

    fn set_joystick(&mut self, port: JoyPort, value: JoystickValue) {
        self.calls.push(MachineCall::JoystickSet(port, value));
    }

    fn frame_buffer(&self) -> FrameBuffer {
        if self.panic_on_frame_buffer {
            panic!("frame buffer unavailable");
        }
        FrameBuffer {
            width: 4,
            height: 2,
            pixels: vec![0u8; 8],
        }
    }
}
