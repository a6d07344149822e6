//! Tick-driven scheduler that drives both release arenas.
//!
//! The scheduler registers itself with the host's per-frame tick only while
//! there is work to do, tracked by a single `armed` flag:
//!
//! - `ensure_armed` is idempotent; the flag flips only on the 0→1
//!   active-entry transition.
//! - The tick pass runs in a strict order: clear the flag FIRST, then tick
//!   both arenas exactly once, then re-arm if anything remains.  The flag
//!   must mean "no tick pass outstanding" at the moment re-arming is
//!   evaluated; clearing it after the arena scan would let the pass mistake
//!   its own leftover work for an already-scheduled one and stay disarmed.
//!
//! The flag is atomic because a multi-threaded host may observe it from
//! outside the host thread (diagnostics, shutdown); both arenas themselves
//! are host-thread-only and need no lock.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use retrolink_core::Machine;

use crate::release::arena::{
    CapacityExceeded, KeyRelease, MatrixRelease, ReleaseArena, SlotId,
};

/// Owns the two release arenas and the armed flag.
///
/// Construct one at subsystem startup and thread it through the host
/// runtime; there is no global instance, which keeps test setup and
/// teardown trivial.
pub struct ReleaseScheduler {
    matrix: ReleaseArena<MatrixRelease>,
    keys: ReleaseArena<KeyRelease>,
    /// True iff a tick pass is currently registered with the host tick.
    /// At most one, regardless of how many entries are pending.
    armed: AtomicBool,
    /// How many tick passes have actually run.  External probe for tests
    /// and diagnostics: once the arenas drain, this stops advancing until
    /// the next `schedule_*` call.
    ticks_processed: u64,
}

impl ReleaseScheduler {
    pub fn new() -> Self {
        ReleaseScheduler {
            matrix: ReleaseArena::new(),
            keys: ReleaseArena::new(),
            armed: AtomicBool::new(false),
            ticks_processed: 0,
        }
    }

    /// Schedules an auto-release of a matrix switch and arms the tick pass.
    pub fn schedule_matrix_release(
        &mut self,
        target: MatrixRelease,
        frames: u32,
    ) -> Result<SlotId, CapacityExceeded> {
        let id = self.matrix.schedule(target, frames)?;
        self.ensure_armed();
        Ok(id)
    }

    /// Schedules an auto-release of a logical key and arms the tick pass.
    pub fn schedule_key_release(
        &mut self,
        target: KeyRelease,
        frames: u32,
    ) -> Result<SlotId, CapacityExceeded> {
        let id = self.keys.schedule(target, frames)?;
        self.ensure_armed();
        Ok(id)
    }

    /// Idempotently registers the tick pass with the host tick.
    ///
    /// Only the false→true transition does anything; calling this with the
    /// flag already set is a no-op, so any number of pending entries share
    /// one registration.
    pub fn ensure_armed(&self) {
        if self
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("release scheduler armed");
        }
    }

    /// Whether a tick pass is currently registered.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// External tick-count probe: total tick passes that have run.
    pub fn ticks_processed(&self) -> u64 {
        self.ticks_processed
    }

    /// Total pending entries across both arenas.
    pub fn pending(&self) -> usize {
        self.matrix.pending() + self.keys.pending()
    }

    /// Called once per host tick by the host loop.
    ///
    /// Processes exactly one frame of decrement, never more, and only
    /// while armed.  Order is load-bearing: (a) clear the flag, (b) tick
    /// both arenas, (c) re-arm iff either still has entries.
    pub fn on_host_tick(&mut self, machine: &mut dyn Machine) {
        // (a) Take the registration down before doing any work.
        if !self.armed.swap(false, Ordering::AcqRel) {
            return;
        }

        // (b) One frame of decrement for every active entry, both arenas.
        self.ticks_processed += 1;
        let matrix_remaining = self.matrix.tick(machine);
        let keys_remaining = self.keys.tick(machine);

        // (c) Still work left: register for the next tick.
        if matrix_remaining || keys_remaining {
            self.ensure_armed();
        } else {
            debug!("release scheduler drained; disarmed");
        }
    }

    /// Logs the standard warning for a failed schedule.  The initiating
    /// press has already been applied, so the call still succeeds; it just
    /// will not auto-release.
    pub fn warn_capacity(err: CapacityExceeded) {
        warn!("failed to schedule auto-release: {err}");
    }
}

impl Default for ReleaseScheduler {
    fn default() -> Self {
        Self::new()
    }
}
