//! Tool dispatch: one named operation executed against the machine.
//!
//! The dispatcher itself is stateless bookkeeping, a registry scan and the
//! request-shape check.  Everything interesting happens in the handlers
//! (`input`, `display`), which validate their own fields and perform their
//! side effects.  Handlers are intentionally not idempotent: two presses
//! press twice.
//!
//! Every dispatch runs on the host thread with exclusive access to the
//! machine and the release scheduler, threaded through [`ToolContext`].

pub mod display;
pub mod input;

use serde_json::Value;
use tracing::debug;

use retrolink_core::protocol::messages::validate_tool_name;
use retrolink_core::{Machine, RpcError};

use crate::release::ReleaseScheduler;

/// Mutable state a handler may touch, borrowed for the duration of one call.
pub struct ToolContext<'a> {
    pub machine: &'a mut dyn Machine,
    pub scheduler: &'a mut ReleaseScheduler,
}

/// Signature of every tool handler.
///
/// Plain function pointers keep the registry `'static` and trivially
/// shareable; handlers get their state through the context instead of
/// capturing it.
pub type ToolHandler = fn(&mut ToolContext<'_>, &Value) -> Result<Value, RpcError>;

struct ToolEntry {
    name: &'static str,
    #[allow(dead_code)] // surfaced by `tools()` for introspection
    description: &'static str,
    handler: ToolHandler,
}

/// Registry of named tools with exact-match lookup.
pub struct ToolDispatcher {
    registry: Vec<ToolEntry>,
}

impl ToolDispatcher {
    /// Builds the registry with every built-in tool.
    pub fn new() -> Self {
        let registry = vec![
            ToolEntry {
                name: "machine.ping",
                description: "Check that the machine is responding",
                handler: input::tool_ping,
            },
            ToolEntry {
                name: "keyboard.type",
                description: "Type text through the emulated keyboard buffer",
                handler: input::tool_keyboard_type,
            },
            ToolEntry {
                name: "keyboard.key_press",
                description: "Press a logical key, optionally auto-releasing after a hold",
                handler: input::tool_keyboard_key_press,
            },
            ToolEntry {
                name: "keyboard.key_release",
                description: "Release a logical key",
                handler: input::tool_keyboard_key_release,
            },
            ToolEntry {
                name: "keyboard.matrix",
                description: "Set or clear one switch in the keyboard matrix",
                handler: input::tool_keyboard_matrix,
            },
            ToolEntry {
                name: "keyboard.restore",
                description: "Press or release the RESTORE key (NMI line)",
                handler: input::tool_keyboard_restore,
            },
            ToolEntry {
                name: "joystick.set",
                description: "Set the absolute joystick state for one port",
                handler: input::tool_joystick_set,
            },
            ToolEntry {
                name: "display.screenshot",
                description: "Capture the current frame buffer",
                handler: display::tool_display_screenshot,
            },
            ToolEntry {
                name: "display.dimensions",
                description: "Report the frame buffer dimensions",
                handler: display::tool_display_dimensions,
            },
        ];
        ToolDispatcher { registry }
    }

    /// Validates the name, finds the handler, runs it.
    ///
    /// # Errors
    ///
    /// `INVALID_REQUEST` for a malformed name (no handler runs),
    /// `METHOD_NOT_FOUND` for an unregistered one, and whatever the handler
    /// itself returns.
    pub fn dispatch(
        &self,
        ctx: &mut ToolContext<'_>,
        name: &str,
        params: &Value,
    ) -> Result<Value, RpcError> {
        validate_tool_name(name)?;

        let entry = self
            .registry
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| RpcError::MethodNotFound(name.to_string()))?;

        debug!("dispatching tool: {name}");
        (entry.handler)(ctx, params)
    }

    /// Registered tool names, in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registry.iter().map(|entry| entry.name)
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
