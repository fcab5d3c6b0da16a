//! MCP tool dispatch for dirscope.
//!
//! Every clone of [`DirscopeService`] shares one [`Lister`], so stream ids and cached listings
//! are visible to every connection of the process and to nothing outside it.

mod router;

use dirscope_lister::{EngineConfig, Lister};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool_handler, ServerHandler};
use std::sync::Arc;

use router::error::ToolError;

#[derive(Clone)]
pub struct DirscopeService {
    lister: Arc<Lister>,
    tool_router: ToolRouter<Self>,
}

impl DirscopeService {
    pub fn new() -> Self {
        let config = EngineConfig::from_env();
        match config.cache_dir.as_deref() {
            Some(dir) => log::info!("Listing cache at {}", dir.display()),
            None => log::info!("Listing cache is memory-only"),
        }
        Self::with_lister(Arc::new(Lister::new(config)))
    }

    pub fn with_lister(lister: Arc<Lister>) -> Self {
        Self {
            lister,
            tool_router: router::build_tool_router(),
        }
    }

    pub(in crate::tools::dispatch) fn lister(&self) -> &Lister {
        &self.lister
    }

    /// Runs an engine call off the async runtime.
    pub(in crate::tools::dispatch) async fn run_blocking<T, F>(&self, job: F) -> Result<T, ToolError>
    where
        F: FnOnce(&Lister) -> dirscope_lister::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let lister = self.lister.clone();
        match tokio::task::spawn_blocking(move || job(&lister)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ToolError::Scan(err)),
            Err(err) => Err(ToolError::Join(err)),
        }
    }
}

impl Default for DirscopeService {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for DirscopeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Dirscope lists directories in bounded batches. Call 'scan' with a directory and follow batch.nextOffset to page; use 'pagination_info' to plan every offset up front; use 'stream_start'/'stream_next'/'stream_stop' to walk very large trees without materializing them; 'scan_metadata_only' returns entries without paths."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// Success result whose text is the JSON document and whose structured content is the same value.
pub(in crate::tools::dispatch) fn json_result<T: serde::Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_value(value) {
        Ok(json) => {
            let mut result = CallToolResult::success(vec![Content::text(json.to_string())]);
            result.structured_content = Some(json);
            result
        }
        Err(err) => router::error::internal_error(format!("failed to serialize result: {err}")),
    }
}
