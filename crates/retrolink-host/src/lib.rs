//! # retrolink-host
//!
//! Everything that executes on the emulator's host thread: the deferred
//! auto-release tables, the tick-driven release scheduler, the tool
//! dispatcher with its handlers, and the host side of the cross-thread
//! request bridge.
//!
//! # Threading model
//!
//! The emulator runs a single-threaded real-time loop.  Once per simulated
//! frame that loop calls [`runtime::HostRuntime::process_frame`], which:
//!
//! 1. Advances the release scheduler by exactly one tick.  Releases
//!    scheduled later in the same frame take their first decrement next
//!    frame, so a hold always spans its full number of frame windows.
//! 2. Drains every queued external request and dispatches it with exclusive
//!    access to the [`retrolink_core::Machine`].  No lock is needed because
//!    there is exactly one mutator.
//!
//! Transport tasks never touch the machine.  They call
//! [`bridge::RequestBridge::submit`], which queues the request and suspends
//! the *calling task* (never the host thread) until the result comes back.
//!
//! ```text
//! transport task ──submit──▶ bounded queue ──▶ host loop, once per frame
//!      ▲                                            │ dispatch + tick
//!      └──────────── oneshot reply ◀────────────────┘
//! ```

pub mod bridge;
pub mod release;
pub mod runtime;
pub mod testing;
pub mod tools;

pub use bridge::{bridge_channel, RequestBridge};
pub use release::arena::{CapacityExceeded, ReleaseArena, SlotId, RELEASE_SLOTS};
pub use release::scheduler::ReleaseScheduler;
pub use runtime::HostRuntime;
pub use tools::ToolDispatcher;
