// Per-tool dispatch functions used by the MCP tool router.

pub(super) mod capabilities;
pub(super) mod error;
pub(super) mod pagination;
pub(super) mod scan;
pub(super) mod stream;

mod tool_router;

pub(super) fn build_tool_router() -> rmcp::handler::server::tool::ToolRouter<super::DirscopeService>
{
    tool_router::build_tool_router()
}

pub(super) const TOOL_NAMES: [&str; 7] = [
    "scan",
    "scan_metadata_only",
    "stream_start",
    "stream_next",
    "stream_stop",
    "pagination_info",
    "capabilities",
];
