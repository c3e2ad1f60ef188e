use std::borrow::Cow;

use datashift_core::control::ControlError;
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use serde::Serialize;
use tracing::warn;

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

/// Serializes a successful result as pretty-printed JSON text.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, ErrorData> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        mcp_err(
            ErrorCode::INTERNAL_ERROR,
            format!("failed to serialize result: {err}"),
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Guard rejections keep their own wording; everything else is prefixed with
/// the tool name.
pub fn tool_failure(tool: &str, err: &ControlError) -> CallToolResult {
    warn!(tool, error = %err, "tool call failed");
    let text = match err {
        ControlError::Rejected(message) => (*message).to_string(),
        other => format!("Error executing {tool}: {other}"),
    };
    CallToolResult::error(vec![Content::text(text)])
}

pub fn tool_result<T: Serialize>(
    tool: &str,
    result: Result<T, ControlError>,
) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(value) => json_result(&value),
        Err(err) => Ok(tool_failure(tool, &err)),
    }
}
