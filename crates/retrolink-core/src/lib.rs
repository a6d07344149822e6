//! # retrolink-core
//!
//! Shared library for Retrolink containing the control-protocol envelope,
//! the input domain model, and the `Machine` trait that abstracts the
//! emulator-facing primitives.
//!
//! This crate is used by both the host-thread runtime (`retrolink-host`) and
//! the network server (`retrolink-server`).  It has zero dependencies on
//! async runtimes, sockets, or threads.
//!
//! # Architecture overview
//!
//! Retrolink is a remote-control add-on for a real-time C64-style emulator.
//! An external client connects over the network and can type text, press and
//! release keys, drive a virtual joystick, and pull screenshots.  The
//! emulator's hardware-emulation core keeps running untouched on its own
//! single-threaded real-time loop; Retrolink's job is bridging asynchronous
//! control requests into that loop safely.
//!
//! This crate defines:
//!
//! - **`protocol`** – The request/response envelope and the numeric error
//!   taxonomy shared by every layer (`PARSE_ERROR`, `INVALID_REQUEST`,
//!   `METHOD_NOT_FOUND`, `INVALID_PARAMS`, `INTERNAL_ERROR`, `SERVER_BUSY`).
//!
//! - **`domain`** – Pure input-model logic with no OS dependencies: logical
//!   key codes and modifier masks, keyboard matrix positions, joystick
//!   values, and the millisecond-to-frame hold-duration conversion.
//!
//! The emulator itself is an external collaborator.  The [`Machine`] trait
//! is the seam: the host loop hands a `&mut dyn Machine` to the tool
//! handlers, and tests substitute a mock.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `retrolink_core::RpcError` instead of `retrolink_core::protocol::errors::RpcError`.
pub use domain::joystick::{JoyPort, JoystickValue};
pub use domain::keys::{KeyCode, MatrixPos, ModifierMask};
pub use domain::machine::{FeedError, FrameBuffer, Machine};
pub use domain::timing::{frames_for_ms, HoldSpec, FRAME_MS};
pub use protocol::errors::{ErrorObject, RpcError};
pub use protocol::messages::{EventFrame, WireRequest, WireResponse};
