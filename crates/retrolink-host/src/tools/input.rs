//! Keyboard and joystick tool handlers.
//!
//! Each handler validates its own fields (missing or mistyped required
//! fields produce `INVALID_PARAMS` with a field-specific message and no side
//! effect), applies its mutation through the machine trait, and returns a
//! structured payload.
//!
//! Hold semantics (`keyboard.key_press`, `keyboard.matrix`): the press is
//! applied immediately; a hold duration additionally schedules an
//! auto-release with the scheduler.  When no release slot is free the press
//! still succeeds; a warning is logged and the key simply stays down until
//! an explicit release.  Pressing an already-pressed key re-applies the
//! press and, with a new hold, schedules a second independent release; the
//! earlier one may then release the key sooner than the later caller
//! intended.  Deliberately not de-duplicated.

use serde_json::{json, Value};
use tracing::debug;

use retrolink_core::domain::joystick::{JoyPort, JoystickValue};
use retrolink_core::domain::keys::{parse_key_code, parse_modifiers, MatrixPos};
use retrolink_core::domain::timing::HoldSpec;
use retrolink_core::RpcError;

use crate::release::{KeyRelease, MatrixRelease, ReleaseScheduler};
use crate::tools::ToolContext;

/// `machine.ping`: liveness probe.
pub fn tool_ping(ctx: &mut ToolContext<'_>, _params: &Value) -> Result<Value, RpcError> {
    Ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "machine": ctx.machine.machine_name(),
    }))
}

/// `keyboard.type`: queue text into the emulated keyboard buffer.
///
/// `petscii_upper` (default true) folds uppercase ASCII to lowercase before
/// the feed, so the machine's character conversion produces unshifted codes
/// and `"LOAD"` displays as `LOAD` in the default uppercase character set.
/// With it off, uppercase ASCII maps to shifted codes, which display as
/// graphics symbols in that mode.
pub fn tool_keyboard_type(ctx: &mut ToolContext<'_>, params: &Value) -> Result<Value, RpcError> {
    let text = params
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("Missing or invalid 'text' parameter"))?;
    if text.is_empty() {
        return Err(RpcError::invalid_params("Text parameter cannot be empty"));
    }

    // Optional, accepted as bool or number; anything else keeps the default.
    let petscii_upper = match params.get("petscii_upper") {
        Some(v) => v
            .as_bool()
            .or_else(|| v.as_i64().map(|n| n != 0))
            .unwrap_or(true),
        None => true,
    };

    debug!("typing text: {text:?} (petscii_upper={petscii_upper})");

    let feed_result = if petscii_upper {
        let folded: String = text
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c
                }
            })
            .collect();
        ctx.machine.feed_text(&folded)
    } else {
        ctx.machine.feed_text(text)
    };

    feed_result
        .map_err(|e| RpcError::internal(format!("Failed to queue keyboard input ({e})")))?;

    Ok(json!({
        "status": "ok",
        "characters_queued": text.chars().count(),
    }))
}

/// `keyboard.key_press`: press a logical key, optionally with an
/// auto-release hold (1-300 frames / 1-5000 ms, milliseconds winning when
/// both are given).
pub fn tool_keyboard_key_press(
    ctx: &mut ToolContext<'_>,
    params: &Value,
) -> Result<Value, RpcError> {
    let code = parse_key_code(params.get("key"))?;
    let modifiers = parse_modifiers(params.get("modifiers"));
    let hold = HoldSpec::from_params(params, false)?;

    debug!(
        "pressing key: code={code}, modifiers={:#06x}",
        modifiers.bits()
    );
    ctx.machine.key_pressed(code, modifiers);

    let mut response = json!({
        "status": "ok",
        "key_code": code.0,
        "modifiers": modifiers.bits(),
    });

    if let Some(hold) = hold {
        let scheduled = ctx
            .scheduler
            .schedule_key_release(KeyRelease { code, modifiers }, hold.frames);
        if let Err(err) = scheduled {
            ReleaseScheduler::warn_capacity(err);
        }
        response["hold_frames"] = json!(hold.frames);
        if let Some(ms) = hold.from_ms {
            response["hold_ms"] = json!(ms);
        }
        response["auto_release_scheduled"] = json!(scheduled.is_ok());
    }

    Ok(response)
}

/// `keyboard.key_release`: release a logical key immediately.
pub fn tool_keyboard_key_release(
    ctx: &mut ToolContext<'_>,
    params: &Value,
) -> Result<Value, RpcError> {
    let code = parse_key_code(params.get("key"))?;
    let modifiers = parse_modifiers(params.get("modifiers"));

    debug!(
        "releasing key: code={code}, modifiers={:#06x}",
        modifiers.bits()
    );
    ctx.machine.key_released(code, modifiers);

    Ok(json!({
        "status": "ok",
        "key_code": code.0,
        "modifiers": modifiers.bits(),
    }))
}

/// `keyboard.matrix`: set or clear one switch in the keyboard matrix.
///
/// Addressing is `key` (named) XOR `row`+`col` (0-7 each).  Programs that
/// scan the matrix directly only see this form of input, so this bypasses
/// the keyboard mapping layer entirely.  Holds (0-300 frames / 0-5000 ms)
/// only apply to presses; zero means stay pressed until explicitly
/// released.
pub fn tool_keyboard_matrix(ctx: &mut ToolContext<'_>, params: &Value) -> Result<Value, RpcError> {
    let pressed = params
        .get("pressed")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let pos = if let Some(name) = params.get("key").and_then(Value::as_str) {
        MatrixPos::from_name(name).ok_or_else(|| RpcError::invalid_params("Unknown key name"))?
    } else {
        match (
            params.get("row").and_then(Value::as_i64),
            params.get("col").and_then(Value::as_i64),
        ) {
            (Some(row), Some(col)) => MatrixPos::new(row, col)?,
            _ => {
                return Err(RpcError::invalid_params(
                    "Either 'key' name or 'row'/'col' required",
                ))
            }
        }
    };

    let hold = HoldSpec::from_params(params, true)?;

    ctx.machine.set_matrix_key(pos, pressed);
    debug!(
        "matrix key {}: {}",
        pos,
        if pressed { "pressed" } else { "released" }
    );

    let mut response = json!({
        "status": "ok",
        "row": pos.row,
        "col": pos.col,
        "pressed": pressed,
    });

    if pressed {
        if let Some(hold) = hold {
            let scheduled = ctx
                .scheduler
                .schedule_matrix_release(MatrixRelease { pos }, hold.frames);
            if let Err(err) = scheduled {
                ReleaseScheduler::warn_capacity(err);
            }
            response["hold_frames"] = json!(hold.frames);
            if let Some(ms) = hold.from_ms {
                response["hold_ms"] = json!(ms);
            }
            response["auto_release_scheduled"] = json!(scheduled.is_ok());
        }
    }

    Ok(response)
}

/// `keyboard.restore`: drive the RESTORE key line.
///
/// RESTORE is not part of the keyboard matrix; pressing it raises the NMI
/// directly.  Combined with STOP (matrix row 7, col 7) it performs the
/// classic soft reset.
pub fn tool_keyboard_restore(ctx: &mut ToolContext<'_>, params: &Value) -> Result<Value, RpcError> {
    let pressed = params
        .get("pressed")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    ctx.machine.set_restore_key(pressed);
    debug!("RESTORE key {}", if pressed { "pressed" } else { "released" });

    Ok(json!({
        "status": "ok",
        "pressed": pressed,
        "message": if pressed {
            "RESTORE pressed (NMI triggered)"
        } else {
            "RESTORE released"
        },
    }))
}

/// `joystick.set`: set the absolute joystick state for one port.
pub fn tool_joystick_set(ctx: &mut ToolContext<'_>, params: &Value) -> Result<Value, RpcError> {
    let port = JoyPort::from_params(params.get("port"))?;
    let value = JoystickValue::from_params(params.get("direction"), params.get("fire"))?;

    debug!("setting joystick port {port} to {:#06x}", value.bits());
    ctx.machine.set_joystick(port, value);

    Ok(json!({
        "status": "ok",
        "port": port.number(),
        "value": value.bits(),
    }))
}
