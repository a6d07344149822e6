//! Deferred auto-release of synthetic input.
//!
//! One call ("press this key for 200 ms") must produce a correctly-timed
//! press/release pair without blocking anyone.  The press happens
//! immediately; the release is recorded in a fixed-capacity arena and fired
//! by the scheduler once the requested number of simulated frames has
//! elapsed.

pub mod arena;
pub mod scheduler;

pub use arena::{CapacityExceeded, KeyRelease, MatrixRelease, ReleaseArena, ReleaseTarget, SlotId};
pub use scheduler::ReleaseScheduler;
