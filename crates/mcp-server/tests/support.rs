#![allow(dead_code)]

use anyhow::{Context, Result};
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::{RunningService, ServiceExt};
use rmcp::transport::TokioChildProcess;
use rmcp::RoleClient;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

pub fn locate_dirscope_mcp_bin() -> Result<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_dirscope-mcp") {
        return Ok(PathBuf::from(path));
    }

    // `.../target/{debug|release}/deps/<test>` -> `.../target/{debug|release}/dirscope-mcp`
    if let Ok(exe) = std::env::current_exe() {
        if let Some(target_profile_dir) = exe.parent().and_then(|p| p.parent()) {
            let candidate = target_profile_dir.join("dirscope-mcp");
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .context("failed to resolve repo root from CARGO_MANIFEST_DIR")?;
    for rel in ["target/debug/dirscope-mcp", "target/release/dirscope-mcp"] {
        let candidate = repo_root.join(rel);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("failed to locate dirscope-mcp binary; build with: cargo build -p dirscope-mcp")
}

/// Spawns the server with its disk cache confined to `cache_dir`.
pub async fn start_server(cache_dir: &Path) -> Result<RunningService<RoleClient, ()>> {
    let bin = locate_dirscope_mcp_bin()?;
    let mut cmd = Command::new(bin);
    cmd.env("RUST_LOG", "warn");
    cmd.env("DIRSCOPE_CACHE_DIR", cache_dir);
    cmd.env_remove("DIRSCOPE_DISABLE_DISK_CACHE");
    cmd.env_remove("DIRSCOPE_SCAN_TIMEOUT_MS");

    let transport = TokioChildProcess::new(cmd).context("spawn mcp server")?;
    tokio::time::timeout(Duration::from_secs(10), ().serve(transport))
        .await
        .context("timeout starting MCP server")?
        .context("initialize MCP session")
}

pub async fn call_tool_allow_error(
    service: &RunningService<RoleClient, ()>,
    name: &str,
    args: serde_json::Value,
) -> Result<CallToolResult> {
    tokio::time::timeout(
        Duration::from_secs(10),
        service.call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        }),
    )
    .await
    .context("timeout calling tool")?
    .context("call tool")
}

pub async fn call_tool(
    service: &RunningService<RoleClient, ()>,
    name: &str,
    args: serde_json::Value,
) -> Result<serde_json::Value> {
    let result = call_tool_allow_error(service, name, args).await?;
    assert_ne!(
        result.is_error,
        Some(true),
        "{name} returned error: {:?}",
        result.structured_content
    );
    structured(&result)
}

/// The structured JSON, checked against the text content it must mirror.
pub fn structured(result: &CallToolResult) -> Result<serde_json::Value> {
    let value = result
        .structured_content
        .clone()
        .context("tool result missing structured_content")?;
    let text = result
        .content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.as_str())
        .context("tool result missing text output")?;
    let parsed: serde_json::Value =
        serde_json::from_str(text).context("text output is not JSON")?;
    assert_eq!(parsed, value, "text and structured content disagree");
    Ok(value)
}
