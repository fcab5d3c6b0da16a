use super::super::{json_result, CallToolResult, DirscopeService};
use super::TOOL_NAMES;
use crate::tools::schemas::capabilities::CapabilitiesRequest;
use crate::tools::schemas::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use dirscope_lister::{normalize_directory_arg, MAX_DEPTH, MIN_DEPTH};
use dirscope_protocol::{
    Capabilities, CapabilitiesServer, DefaultLimits, ToolNextAction, CAPABILITIES_SCHEMA_VERSION,
};
use serde_json::json;

/// Return version, default limits and a start route for self-directed clients.
pub(in crate::tools::dispatch) fn capabilities(
    service: &DirscopeService,
    request: CapabilitiesRequest,
) -> CallToolResult {
    let config = service.lister().config();
    let directory = request
        .directory
        .as_deref()
        .map(normalize_directory_arg)
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| ".".to_string());

    let start_route = ToolNextAction {
        tool: "scan".to_string(),
        args: json!({
            "directory": directory,
            "batchSize": DEFAULT_BATCH_SIZE,
            "maxDepth": MIN_DEPTH,
        }),
        reason: "Start with one sorted batch of the immediate children; follow batch.nextOffset to page."
            .to_string(),
    };

    let output = Capabilities {
        schema_version: CAPABILITIES_SCHEMA_VERSION,
        server: CapabilitiesServer {
            name: "dirscope-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        default_limits: DefaultLimits {
            batch_size: DEFAULT_BATCH_SIZE,
            min_batch_size: MIN_BATCH_SIZE,
            max_batch_size: MAX_BATCH_SIZE,
            max_depth: MAX_DEPTH,
            scan_memory_budget_mb: config.scan_memory_mb,
            metadata_memory_budget_mb: config.metadata_memory_mb,
            stream_memory_budget_mb: config.stream_memory_mb,
            cache_ttl_secs: config.cache_ttl.as_secs(),
            stream_idle_ttl_secs: config.stream_idle_ttl.as_secs(),
        },
        tools: TOOL_NAMES.iter().map(|name| (*name).to_string()).collect(),
        start_route,
    };

    json_result(&output)
}
