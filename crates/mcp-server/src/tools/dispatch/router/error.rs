use super::super::CallToolResult;
use dirscope_lister::ScanError;
use dirscope_protocol::{ErrorCode, ErrorEnvelope, ToolNextAction};
use rmcp::model::Content;
use serde_json::json;

/// Why a tool call could not produce its result.
#[derive(Debug)]
pub(in crate::tools::dispatch) enum ToolError {
    Scan(ScanError),
    Join(tokio::task::JoinError),
}

/// What a handler knows about the call, used to suggest a follow-up.
#[derive(Debug, Default, Clone, Copy)]
pub(in crate::tools::dispatch) struct CallContext<'a> {
    pub(in crate::tools::dispatch) directory: Option<&'a str>,
    pub(in crate::tools::dispatch) max_depth: Option<usize>,
    pub(in crate::tools::dispatch) batch_size: Option<usize>,
}

fn stream_start_action(context: CallContext<'_>, reason: &str) -> ToolNextAction {
    let mut args = serde_json::Map::new();
    if let Some(directory) = context.directory {
        args.insert("directory".to_string(), json!(directory));
    }
    if let Some(max_depth) = context.max_depth {
        args.insert("maxDepth".to_string(), json!(max_depth));
    }
    if let Some(batch_size) = context.batch_size {
        args.insert("batchSize".to_string(), json!(batch_size));
    }
    ToolNextAction {
        tool: "stream_start".to_string(),
        args: serde_json::Value::Object(args),
        reason: reason.to_string(),
    }
}

pub(in crate::tools::dispatch) fn envelope_for(
    err: &ScanError,
    context: CallContext<'_>,
) -> ErrorEnvelope {
    let mut envelope = ErrorEnvelope::new(err.code(), err.to_string());
    if let Some(processed) = err.entries_processed() {
        envelope = envelope.with_details(json!({
            "partial": true,
            "entriesProcessed": processed,
        }));
    }

    match err {
        ScanError::DirectoryNotFound(_) => envelope.with_hint(
            "Pass an existing directory. Absolute paths, ~ and surrounding quotes are accepted.",
        ),
        ScanError::NotADirectory(_) => {
            envelope.with_hint("The path names a file; pass its parent directory instead.")
        }
        ScanError::PermissionDenied(_) => {
            envelope.with_hint("The server process cannot read this directory.")
        }
        ScanError::MemoryBudgetExceeded { .. } => envelope
            .with_hint("Lower maxDepth, narrow fileTypes, or stream the tree instead of scanning it.")
            .with_next_action(stream_start_action(
                context,
                "Streams hand out entries in batches without materializing the whole tree.",
            )),
        ScanError::DeadlineExceeded { .. } => envelope
            .with_hint("Lower maxDepth or narrow fileTypes to finish within the time limit.")
            .with_next_action(stream_start_action(
                context,
                "Streams return the first entries immediately.",
            )),
        ScanError::SessionNotFound { .. } => envelope.with_next_action(stream_start_action(
            context,
            "Open a new stream; ids are only valid in the server process that issued them.",
        )),
        ScanError::InvalidArgument(_) | ScanError::Io(_) => envelope,
    }
}

pub(in crate::tools::dispatch) fn tool_error_envelope(error: ErrorEnvelope) -> CallToolResult {
    let body = json!({ "error": error });
    let mut result = CallToolResult::error(vec![Content::text(body.to_string())]);
    result.structured_content = Some(body);
    result
}

pub(in crate::tools::dispatch) fn tool_error(err: ToolError, context: CallContext<'_>) -> CallToolResult {
    match err {
        ToolError::Scan(err) => {
            if err.code() == ErrorCode::Internal {
                log::warn!("Tool call failed: {err}");
            } else {
                log::debug!("Tool call rejected: {err}");
            }
            tool_error_envelope(envelope_for(&err, context))
        }
        ToolError::Join(err) => internal_error(format!("listing task failed: {err}")),
    }
}

pub(in crate::tools::dispatch) fn invalid_argument(err: ScanError) -> CallToolResult {
    tool_error(ToolError::Scan(err), CallContext::default())
}

pub(in crate::tools::dispatch) fn internal_error(message: impl Into<String>) -> CallToolResult {
    let message = message.into();
    log::warn!("{message}");
    tool_error_envelope(ErrorEnvelope::new(ErrorCode::Internal, message))
}
