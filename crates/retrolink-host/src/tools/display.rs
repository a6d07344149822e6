//! Display tool handlers: screenshot capture and dimension queries.

use serde_json::{json, Value};
use tracing::debug;

use retrolink_core::RpcError;

use crate::tools::ToolContext;

/// `display.screenshot`: capture the current frame.
///
/// Returns the raw frame exactly as the machine rendered it, one byte per
/// pixel in row-major order.  Encoding to an image format is a client
/// concern.
pub fn tool_display_screenshot(
    ctx: &mut ToolContext<'_>,
    _params: &Value,
) -> Result<Value, RpcError> {
    let frame = ctx.machine.frame_buffer();
    debug!("screenshot: {}x{} frame", frame.width, frame.height);

    Ok(json!({
        "status": "ok",
        "width": frame.width,
        "height": frame.height,
        "pixels": frame.pixels,
    }))
}

/// `display.dimensions`: report the frame size without the pixel payload.
pub fn tool_display_dimensions(
    ctx: &mut ToolContext<'_>,
    _params: &Value,
) -> Result<Value, RpcError> {
    let frame = ctx.machine.frame_buffer();
    Ok(json!({
        "width": frame.width,
        "height": frame.height,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseScheduler;
    use crate::testing::MockMachine;

    #[test]
    fn test_screenshot_returns_raw_frame() {
        let mut machine = MockMachine::new();
        let mut scheduler = ReleaseScheduler::new();
        let mut ctx = ToolContext {
            machine: &mut machine,
            scheduler: &mut scheduler,
        };

        let result = tool_display_screenshot(&mut ctx, &json!({})).unwrap();

        assert_eq!(result["status"], "ok");
        assert_eq!(result["width"], 4);
        assert_eq!(result["height"], 2);
        assert_eq!(result["pixels"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_dimensions_omit_pixels() {
        let mut machine = MockMachine::new();
        let mut scheduler = ReleaseScheduler::new();
        let mut ctx = ToolContext {
            machine: &mut machine,
            scheduler: &mut scheduler,
        };

        let result = tool_display_dimensions(&mut ctx, &json!({})).unwrap();

        assert_eq!(result["width"], 4);
        assert_eq!(result["height"], 2);
        assert!(result.get("pixels").is_none());
    }
}
