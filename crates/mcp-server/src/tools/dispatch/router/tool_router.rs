use super::super::{CallToolResult, DirscopeService};
use crate::tools::schemas::capabilities::CapabilitiesRequest;
use crate::tools::schemas::pagination::PaginationInfoRequest;
use crate::tools::schemas::scan::ScanToolRequest;
use crate::tools::schemas::stream::{StreamNextRequest, StreamStartRequest, StreamStopRequest};

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_router, ErrorData as McpError};

pub(super) fn build_tool_router() -> ToolRouter<DirscopeService> {
    DirscopeService::tool_router()
}

#[tool_router]
impl DirscopeService {
    /// One sorted batch of a directory listing.
    #[tool(
        description = "List one batch of a directory (sorted, filtered, depth 1..=3) plus a summary of the whole listing. Follow batch.nextOffset to page. Results are cached briefly; pass useCache=false to force a fresh walk."
    )]
    pub async fn scan(
        &self,
        Parameters(request): Parameters<ScanToolRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::scan::scan(self, request).await)
    }

    /// Same as `scan`, but entries carry no paths.
    #[tool(
        description = "Like scan, but each entry carries only name, kind, sizeBytes and extension, and the directory is not echoed. Uses a smaller memory budget."
    )]
    pub async fn scan_metadata_only(
        &self,
        Parameters(request): Parameters<ScanToolRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::scan::scan_metadata_only(self, request).await)
    }

    /// Open a server-side cursor.
    #[tool(
        description = "Start a streaming walk and return its first batch plus a streamId. Entries come in walk order (unsorted) and the tree is never fully materialized."
    )]
    pub async fn stream_start(
        &self,
        Parameters(request): Parameters<StreamStartRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::stream::stream_start(self, request).await)
    }

    #[tool(
        description = "Pull the next batch of a stream. An exhausted stream returns an empty batch with hasMore=false until stopped."
    )]
    pub async fn stream_next(
        &self,
        Parameters(request): Parameters<StreamNextRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::stream::stream_next(self, request).await)
    }

    #[tool(
        description = "Stop a stream and release its cursor. The id cannot be reused afterwards."
    )]
    pub async fn stream_stop(
        &self,
        Parameters(request): Parameters<StreamStopRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::stream::stream_stop(self, request).await)
    }

    /// Paging plan for a listing.
    #[tool(
        description = "Walk a directory once and return totalFiles, totalDirectories, totalBatches and every batchOffset needed to page through it with scan."
    )]
    pub async fn pagination_info(
        &self,
        Parameters(request): Parameters<PaginationInfoRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::pagination::pagination_info(self, request).await)
    }

    /// Tool capabilities handshake (version, limits, start route).
    #[tool(
        description = "Return server version, default limits and the recommended first call."
    )]
    pub async fn capabilities(
        &self,
        Parameters(request): Parameters<CapabilitiesRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(super::capabilities::capabilities(self, request))
    }
}
