use catalog_core::{CatalogError, CatalogResult};
use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

/// Wraps a control plane result as a tool result.
///
/// Domain failures become error results carrying `{error, kind}`. Only
/// serialization failures surface as protocol errors.
pub(crate) fn tool_result<T, F>(result: CatalogResult<T>, shape: F) -> Result<CallToolResult, ErrorData>
where
    F: FnOnce(T) -> serde_json::Value,
{
    match result {
        Ok(value) => Ok(CallToolResult::success(vec![Content::json(shape(value))?])),
        Err(err) => error_result(&err),
    }
}

pub(crate) fn json_result<T: Serialize>(result: CatalogResult<T>) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(value) => Ok(CallToolResult::success(vec![Content::json(value)?])),
        Err(err) => error_result(&err),
    }
}

pub(crate) fn error_result(err: &CatalogError) -> Result<CallToolResult, ErrorData> {
    if err.is_validation() {
        debug!(kind = err.kind(), error = %err, "tool input rejected");
    } else {
        warn!(kind = err.kind(), error = %err, "tool call failed");
    }
    Ok(CallToolResult::error(vec![Content::json(json!({
        "error": err.to_string(),
        "kind": err.kind(),
    }))?]))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn payload(result: &CallToolResult) -> Value {
        let text = result.content[0]
            .as_text()
            .map(|content| content.text.clone())
            .expect("text content");
        serde_json::from_str(&text).expect("json content")
    }

    #[test]
    fn domain_errors_become_error_results() {
        let err = CatalogError::InvalidDirection("SIDEWAYS".to_string());
        let result = error_result(&err).expect("tool result");
        assert_eq!(result.is_error, Some(true));
        let body = payload(&result);
        assert_eq!(body["kind"], "InvalidDirectionError");
        assert!(body["error"].as_str().is_some_and(|text| text.contains("SIDEWAYS")));
    }

    #[test]
    fn successes_are_shaped() {
        let result = tool_result(Ok::<_, CatalogError>(3_usize), |count| json!({ "count": count }))
            .expect("tool result");
        assert_ne!(result.is_error, Some(true));
        assert_eq!(payload(&result)["count"], 3);
    }
}
