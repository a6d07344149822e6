//! Hold-duration arithmetic: milliseconds to simulated frames.
//!
//! Auto-release timing is counted in **simulated frames**, not wall-clock
//! time.  One frame is the host's native tick (20 ms at the PAL rate of
//! 50 Hz).  While the host is paused no ticks occur, so the elapsed real
//! time of a hold may exceed its nominal duration; that is correct,
//! documented behaviour, not drift.
//!
//! Dual-unit parameters: a caller may give `hold_frames`, `hold_ms`, or
//! both.  **Milliseconds take precedence when both are present**; this is
//! an explicit rule, not an accident of evaluation order.

use serde_json::Value;

use crate::protocol::errors::RpcError;

/// Nominal milliseconds per simulated frame (PAL, 50 Hz).
pub const FRAME_MS: u32 = 20;

/// Upper bound on a hold in frames (5 seconds of PAL frames plus slack).
pub const MAX_HOLD_FRAMES: u32 = 300;

/// Upper bound on a hold in milliseconds.
pub const MAX_HOLD_MS: u32 = 5000;

/// Converts a positive millisecond duration to frames: `ceil(ms / 20)`,
/// never less than 1.
pub fn frames_for_ms(ms: u32) -> u32 {
    ((ms + FRAME_MS - 1) / FRAME_MS).max(1)
}

/// A validated hold duration resolved to frames.
///
/// `from_ms` records the original millisecond value when the caller used
/// `hold_ms`, so responses can echo both units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldSpec {
    /// Resolved duration in frames, always ≥ 1.
    pub frames: u32,
    /// The millisecond value the frames were derived from, if any.
    pub from_ms: Option<u32>,
}

impl HoldSpec {
    /// Parses `hold_frames` / `hold_ms` from a parameter object.
    ///
    /// Returns `Ok(None)` when no hold was requested: either both fields
    /// are absent, or (when `allow_zero` is set) an explicit zero was given,
    /// meaning "press and stay pressed until an explicit release".
    ///
    /// `allow_zero` selects the per-tool range: the key-press tool requires
    /// 1-300 frames / 1-5000 ms, the matrix tool accepts 0-300 / 0-5000.
    ///
    /// # Errors
    ///
    /// `INVALID_PARAMS` when a given value falls outside its range.
    pub fn from_params(params: &Value, allow_zero: bool) -> Result<Option<HoldSpec>, RpcError> {
        let min: u32 = if allow_zero { 0 } else { 1 };

        let mut frames: Option<u32> = None;
        if let Some(raw) = params.get("hold_frames").and_then(Value::as_i64) {
            if raw < min as i64 || raw > MAX_HOLD_FRAMES as i64 {
                return Err(RpcError::InvalidParams(format!(
                    "hold_frames must be {min}-{MAX_HOLD_FRAMES}"
                )));
            }
            frames = Some(raw as u32);
        }

        // Milliseconds win when both units are present.
        if let Some(raw) = params.get("hold_ms").and_then(Value::as_i64) {
            if raw < min as i64 || raw > MAX_HOLD_MS as i64 {
                return Err(RpcError::InvalidParams(format!(
                    "hold_ms must be {min}-{MAX_HOLD_MS}"
                )));
            }
            let ms = raw as u32;
            return Ok(if ms == 0 {
                None
            } else {
                Some(HoldSpec {
                    frames: frames_for_ms(ms),
                    from_ms: Some(ms),
                })
            });
        }

        Ok(match frames {
            None | Some(0) => None,
            Some(frames) => Some(HoldSpec {
                frames,
                from_ms: None,
            }),
        })
    }
}
