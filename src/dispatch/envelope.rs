use crate::error::{ErrorKind, ToolError};
use rmcp::model::{CallToolResult, Content};

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Success(String),
    Failure(ToolError),
}

impl ResultEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e.kind()),
        }
    }

    /// Text a client sees for this outcome.
    pub fn text(&self) -> String {
        match self {
            Self::Success(text) => text.clone(),
            Self::Failure(e) => format!("Error: {e}"),
        }
    }

    pub fn into_tool_result(self) -> CallToolResult {
        match self {
            Self::Success(text) => CallToolResult::success(vec![Content::text(text)]),
            Self::Failure(e) => e.to_tool_result(),
        }
    }
}

impl From<Result<String, ToolError>> for ResultEnvelope {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => Self::Success(text),
            Err(e) => Self::Failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_is_prefixed() {
        let envelope = ResultEnvelope::Failure(ToolError::MissingArgument("goal".into()));
        assert_eq!(envelope.text(), "Error: Missing required argument: goal");
        let result = envelope.into_tool_result();
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn success_is_not_an_error() {
        let result = ResultEnvelope::Success("Successfully executed: click".into()).into_tool_result();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.content.len(), 1);
    }
}
