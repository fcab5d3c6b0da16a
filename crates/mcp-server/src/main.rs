//! Dirscope MCP Server
//!
//! Lists directories for AI agents in bounded, paginated batches.
//!
//! ## Tools
//!
//! - `scan` - One batch of a sorted listing plus whole-tree summary
//! - `scan_metadata_only` - Same, with name/kind/size/extension entries only
//! - `stream_start` / `stream_next` / `stream_stop` - Pull-based cursor over a walk
//! - `pagination_info` - Every batch offset a caller needs to page through a listing
//! - `capabilities` - Versions, default limits and the recommended first call
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "dirscope": {
//!       "command": "dirscope-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

mod tools;

use tools::DirscopeService;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting dirscope MCP server");

    let service = DirscopeService::new();
    let server = service.serve(stdio()).await?;

    server.waiting().await?;

    log::info!("Dirscope MCP server stopped");
    Ok(())
}
