//! The seam between the control plane and the emulator core.
//!
//! The emulator is an external collaborator: its CPU, video, and input
//! scanning run on a single-threaded real-time loop that this crate never
//! touches.  [`Machine`] is the narrow set of primitives the tool handlers
//! are allowed to drive.  Every method is called exclusively from the host
//! thread, so implementations need no internal locking and the trait does
//! not require `Sync`.
//!
//! Handlers are deliberately NOT idempotent through this trait: two presses
//! press twice, and the matrix keeps whatever state the last call set.

use thiserror::Error;

use crate::domain::joystick::{JoyPort, JoystickValue};
use crate::domain::keys::{KeyCode, MatrixPos, ModifierMask};

/// Why a text feed was refused by the emulated keyboard buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The emulated keyboard buffer has no room for the text.
    #[error("keyboard buffer full")]
    BufferFull,
    /// The keyboard buffer device is disabled in the emulated machine.
    #[error("keyboard buffer disabled")]
    Disabled,
}

/// A snapshot of the emulator's frame buffer.
///
/// Raw pixels only; image-format encoding is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// One byte per pixel, row-major, `width * height` entries.
    pub pixels: Vec<u8>,
}

/// Emulator-facing primitives, implemented by the real emulator binding and
/// by test mocks.
pub trait Machine {
    /// Human-readable machine name for liveness responses (e.g. `"C64"`).
    fn machine_name(&self) -> &str;

    /// Queues text into the emulated keyboard buffer, as if typed at the
    /// BASIC prompt.  The text must already be in the case the machine's
    /// character conversion expects.
    fn feed_text(&mut self, text: &str) -> Result<(), FeedError>;

    /// Presses a logical key through the keyboard mapping layer.
    fn key_pressed(&mut self, code: KeyCode, modifiers: ModifierMask);

    /// Releases a logical key.
    fn key_released(&mut self, code: KeyCode, modifiers: ModifierMask);

    /// Sets or clears one switch in the 8×8 keyboard matrix directly,
    /// bypassing the mapping layer.
    fn set_matrix_key(&mut self, pos: MatrixPos, pressed: bool);

    /// Drives the RESTORE key line (raises the NMI when pressed).
    fn set_restore_key(&mut self, pressed: bool);

    /// Sets the absolute joystick state for one port.
    fn set_joystick(&mut self, port: JoyPort, value: JoystickValue);

    /// Captures the current frame buffer.
    fn frame_buffer(&self) -> FrameBuffer;
}
