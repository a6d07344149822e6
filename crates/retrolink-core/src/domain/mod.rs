//! Pure input-domain logic with no OS or runtime dependencies.
//!
//! Everything here is data and conversion: logical key codes, modifier
//! masks, keyboard-matrix positions, joystick bitmasks, and the
//! millisecond-to-frame hold-duration arithmetic.  The only abstraction is
//! [`machine::Machine`], the seam between this control plane and the
//! emulator core it drives.

pub mod joystick;
pub mod keys;
pub mod machine;
pub mod timing;
