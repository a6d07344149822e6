//! Virtual joystick model: ports, direction bitmask, and parameter parsing.
//!
//! The joystick value is the classic digital bitmask the emulator's input
//! port expects: four direction bits plus fire.  Setting a value is
//! absolute: it replaces the previous state entirely, so "center with no
//! fire" is simply the zero value.

use serde_json::Value;
use std::fmt;

use crate::protocol::errors::RpcError;

/// One of the two joystick ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoyPort {
    Port1,
    Port2,
}

impl JoyPort {
    /// Parses the optional `port` field (1 or 2, default 1).
    pub fn from_params(port: Option<&Value>) -> Result<JoyPort, RpcError> {
        match port.and_then(Value::as_i64) {
            None => Ok(JoyPort::Port1),
            Some(1) => Ok(JoyPort::Port1),
            Some(2) => Ok(JoyPort::Port2),
            Some(_) => Err(RpcError::invalid_params("Port must be 1 or 2")),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            JoyPort::Port1 => 1,
            JoyPort::Port2 => 2,
        }
    }
}

impl fmt::Display for JoyPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Absolute joystick state: direction bits OR-combined with fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoystickValue(pub u16);

impl JoystickValue {
    pub const CENTER: JoystickValue = JoystickValue(0);
    pub const UP: JoystickValue = JoystickValue(1);
    pub const DOWN: JoystickValue = JoystickValue(2);
    pub const LEFT: JoystickValue = JoystickValue(4);
    pub const RIGHT: JoystickValue = JoystickValue(8);
    pub const FIRE: JoystickValue = JoystickValue(16);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn with(self, other: JoystickValue) -> JoystickValue {
        JoystickValue(self.0 | other.0)
    }

    /// Parses the optional `direction` and `fire` fields into one value.
    ///
    /// `direction` may be a single name (`none`/`center`/`up`/`down`/`left`/
    /// `right`) or an array of the directional subset, OR-combined.  A
    /// single unknown name is rejected; inside an array, non-directional
    /// entries are skipped (lenient, matching the modifier policy).
    pub fn from_params(direction: Option<&Value>, fire: Option<&Value>) -> Result<JoystickValue, RpcError> {
        let mut value = JoystickValue::CENTER;

        match direction {
            None => {}
            Some(dir) if dir.is_string() => {
                match dir.as_str().unwrap_or_default() {
                    "up" => value = value.with(JoystickValue::UP),
                    "down" => value = value.with(JoystickValue::DOWN),
                    "left" => value = value.with(JoystickValue::LEFT),
                    "right" => value = value.with(JoystickValue::RIGHT),
                    "none" | "center" => {}
                    _ => return Err(RpcError::invalid_params("Invalid direction")),
                }
            }
            Some(dir) if dir.is_array() => {
                for entry in dir.as_array().unwrap_or(&Vec::new()) {
                    match entry.as_str() {
                        Some("up") => value = value.with(JoystickValue::UP),
                        Some("down") => value = value.with(JoystickValue::DOWN),
                        Some("left") => value = value.with(JoystickValue::LEFT),
                        Some("right") => value = value.with(JoystickValue::RIGHT),
                        _ => {}
                    }
                }
            }
            Some(_) => {}
        }

        if fire.and_then(Value::as_bool) == Some(true) {
            value = value.with(JoystickValue::FIRE);
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_defaults_to_one() {
        assert_eq!(JoyPort::from_params(None).unwrap(), JoyPort::Port1);
    }

    #[test]
    fn test_port_two_is_accepted() {
        assert_eq!(JoyPort::from_params(Some(&json!(2))).unwrap(), JoyPort::Port2);
    }

    #[test]
    fn test_port_out_of_range_is_invalid_params() {
        let err = JoyPort::from_params(Some(&json!(3))).unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn test_single_direction_sets_one_bit() {
        let v = JoystickValue::from_params(Some(&json!("up")), None).unwrap();
        assert_eq!(v.bits(), 1);
    }

    #[test]
    fn test_center_and_none_are_zero() {
        assert_eq!(JoystickValue::from_params(Some(&json!("center")), None).unwrap().bits(), 0);
        assert_eq!(JoystickValue::from_params(Some(&json!("none")), None).unwrap().bits(), 0);
    }

    #[test]
    fn test_invalid_single_direction_is_rejected() {
        let err = JoystickValue::from_params(Some(&json!("diagonal")), None).unwrap_err();
        assert!(err.to_string().contains("Invalid direction"));
    }

    #[test]
    fn test_direction_array_or_combines() {
        // A diagonal: up + right = 1 | 8.
        let v = JoystickValue::from_params(Some(&json!(["up", "right"])), None).unwrap();
        assert_eq!(v.bits(), 9);
    }

    #[test]
    fn test_fire_sets_bit_sixteen() {
        let v = JoystickValue::from_params(Some(&json!("left")), Some(&json!(true))).unwrap();
        assert_eq!(v.bits(), 4 | 16);
    }

    #[test]
    fn test_fire_false_leaves_value_unchanged() {
        let v = JoystickValue::from_params(None, Some(&json!(false))).unwrap();
        assert_eq!(v, JoystickValue::CENTER);
    }
}
