//! Fixed-capacity slot store for pending auto-releases.
//!
//! Timing is **frame counting**, not clock comparison: every host tick
//! decrements each pending entry once, and an entry fires when its count
//! reaches zero.  Frame counting cannot loop or fire early, and ticks simply
//! stop while the host is paused; a hold then stretches in wall-clock time,
//! which is the documented behaviour.
//!
//! Two arenas exist side by side, one per addressing scheme (matrix
//! positions and logical keys).  They share these mechanics but are keyed
//! independently and never collide.  Capacity is small and fixed
//! ([`RELEASE_SLOTS`]): it bounds memory and keeps the per-tick scan trivial
//! next to the frame budget.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use retrolink_core::{KeyCode, Machine, MatrixPos, ModifierMask};

/// Number of slots in each arena.
pub const RELEASE_SLOTS: usize = 16;

/// Identifies the slot an entry was stored in.  Diagnostic only, since
/// slots are recycled as soon as their entry fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(pub usize);

/// All slots are occupied.
///
/// Not fatal: the caller's press has already been applied, so the caller
/// logs a warning and proceeds without an auto-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no free auto-release slot (capacity {RELEASE_SLOTS})")]
pub struct CapacityExceeded;

/// Something that knows how to undo its press on the machine.
pub trait ReleaseTarget: Copy + fmt::Debug {
    fn release(&self, machine: &mut dyn Machine);
}

/// A pending release of one matrix switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixRelease {
    pub pos: MatrixPos,
}

impl ReleaseTarget for MatrixRelease {
    fn release(&self, machine: &mut dyn Machine) {
        machine.set_matrix_key(self.pos, false);
        debug!("auto-released matrix key {}", self.pos);
    }
}

/// A pending release of one logical key (with the modifiers it was pressed
/// with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRelease {
    pub code: KeyCode,
    pub modifiers: ModifierMask,
}

impl ReleaseTarget for KeyRelease {
    fn release(&self, machine: &mut dyn Machine) {
        machine.key_released(self.code, self.modifiers);
        debug!(
            "auto-released key code={} modifiers={:#06x}",
            self.code,
            self.modifiers.bits()
        );
    }
}

/// One occupied slot.
#[derive(Debug, Clone, Copy)]
struct PendingRelease<T> {
    target: T,
    frames_remaining: i32,
}

/// Fixed-capacity arena of pending releases for one target kind.
pub struct ReleaseArena<T: ReleaseTarget> {
    slots: [Option<PendingRelease<T>>; RELEASE_SLOTS],
}

impl<T: ReleaseTarget> ReleaseArena<T> {
    pub fn new() -> Self {
        ReleaseArena {
            slots: [None; RELEASE_SLOTS],
        }
    }

    /// Records a release to fire after `frames` ticks, in the first free
    /// slot.
    ///
    /// Duplicate targets are allowed: two presses of the same key each get
    /// their own slot and fire independently.  A full arena returns
    /// [`CapacityExceeded`] and leaves every existing slot untouched.
    pub fn schedule(&mut self, target: T, frames: u32) -> Result<SlotId, CapacityExceeded> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(PendingRelease {
                    target,
                    frames_remaining: frames as i32,
                });
                debug!("scheduled release {target:?} in {frames} frame(s), slot {index}");
                return Ok(SlotId(index));
            }
        }
        Err(CapacityExceeded)
    }

    /// Advances every pending entry by one frame, firing and vacating those
    /// that reach zero.  Each entry fires exactly once.
    ///
    /// Returns whether any entry is still pending.
    pub fn tick(&mut self, machine: &mut dyn Machine) -> bool {
        let mut remaining = false;
        for slot in self.slots.iter_mut() {
            if let Some(pending) = slot {
                pending.frames_remaining -= 1;
                if pending.frames_remaining <= 0 {
                    pending.target.release(machine);
                    *slot = None;
                } else {
                    remaining = true;
                }
            }
        }
        remaining
    }

    /// Number of occupied slots.
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl<T: ReleaseTarget> Default for ReleaseArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MachineCall, MockMachine};

    fn space() -> MatrixRelease {
        MatrixRelease {
            pos: MatrixPos { row: 7, col: 4 },
        }
    }

    #[test]
    fn test_entry_fires_on_requested_tick_not_before() {
        // Arrange: 5 frames, as produced by hold_ms=100.
        let mut arena = ReleaseArena::new();
        let mut machine = MockMachine::new();
        arena.schedule(space(), 5).unwrap();

        // Act + Assert: four ticks must not release anything.
        for tick in 1..=4 {
            arena.tick(&mut machine);
            assert!(machine.calls.is_empty(), "released early at tick {tick}");
        }

        // The fifth tick fires exactly one release.
        let remaining = arena.tick(&mut machine);
        assert_eq!(
            machine.calls,
            vec![MachineCall::MatrixSet(MatrixPos { row: 7, col: 4 }, false)]
        );
        assert!(!remaining);
    }

    #[test]
    fn test_entry_fires_exactly_once() {
        let mut arena = ReleaseArena::new();
        let mut machine = MockMachine::new();
        arena.schedule(space(), 1).unwrap();

        arena.tick(&mut machine);
        arena.tick(&mut machine);
        arena.tick(&mut machine);

        assert_eq!(machine.calls.len(), 1);
        assert_eq!(arena.pending(), 0);
    }

    #[test]
    fn test_tick_reports_remaining_entries() {
        let mut arena = ReleaseArena::new();
        let mut machine = MockMachine::new();
        arena.schedule(space(), 1).unwrap();
        arena
            .schedule(
                MatrixRelease {
                    pos: MatrixPos { row: 0, col: 1 },
                },
                3,
            )
            .unwrap();

        // First tick fires the 1-frame entry; the 3-frame one remains.
        assert!(arena.tick(&mut machine));
        assert!(arena.tick(&mut machine));
        assert!(!arena.tick(&mut machine));
        assert_eq!(machine.calls.len(), 2);
    }

    #[test]
    fn test_capacity_exceeded_leaves_existing_slots_untouched() {
        // Arrange: fill all slots with distinct frame counts.
        let mut arena = ReleaseArena::new();
        for i in 0..RELEASE_SLOTS {
            arena.schedule(space(), (i + 1) as u32).unwrap();
        }

        // Act
        let err = arena.schedule(space(), 1).unwrap_err();

        // Assert: error returned, no slot was overwritten.
        assert_eq!(err, CapacityExceeded);
        assert_eq!(arena.pending(), RELEASE_SLOTS);

        // The earliest entry still fires at its original time.
        let mut machine = MockMachine::new();
        arena.tick(&mut machine);
        assert_eq!(machine.calls.len(), 1);
    }

    #[test]
    fn test_slots_are_recycled_after_firing() {
        let mut arena = ReleaseArena::new();
        let mut machine = MockMachine::new();
        for _ in 0..RELEASE_SLOTS {
            arena.schedule(space(), 1).unwrap();
        }
        arena.tick(&mut machine);

        // The arena drained, so scheduling succeeds again.
        assert_eq!(arena.pending(), 0);
        assert!(arena.schedule(space(), 1).is_ok());
    }

    #[test]
    fn test_duplicate_targets_fire_independently() {
        // Two holds on the same key: each fires at its own time.  The first
        // release can precede the second caller's intended duration; entries
        // are never de-duplicated.
        let mut arena = ReleaseArena::new();
        let mut machine = MockMachine::new();
        arena.schedule(space(), 1).unwrap();
        arena.schedule(space(), 3).unwrap();

        arena.tick(&mut machine);
        assert_eq!(machine.calls.len(), 1);
        arena.tick(&mut machine);
        arena.tick(&mut machine);
        assert_eq!(machine.calls.len(), 2);
    }

    #[test]
    fn test_key_release_target_releases_with_modifiers() {
        let mut arena = ReleaseArena::new();
        let mut machine = MockMachine::new();
        arena
            .schedule(
                KeyRelease {
                    code: KeyCode(65),
                    modifiers: ModifierMask::SHIFT,
                },
                1,
            )
            .unwrap();

        arena.tick(&mut machine);
        assert_eq!(
            machine.calls,
            vec![MachineCall::KeyReleased(KeyCode(65), ModifierMask::SHIFT)]
        );
    }
}
