use dirscope_lister::ScanResponse;
use dirscope_protocol::ToolNextAction;
use serde_json::{json, Value};

use super::super::{json_result, CallToolResult, DirscopeService};
use super::error::{invalid_argument, tool_error, CallContext};
use crate::tools::schemas::scan::ScanToolRequest;

/// Same arguments as the answered call, moved to the next offset.
fn next_page_action(response: &ScanResponse, use_cache: bool) -> Option<ToolNextAction> {
    let next_offset = response.batch.next_offset?;
    let mut args = match serde_json::to_value(&response.filters) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    args.insert("directory".to_string(), json!(response.directory));
    args.insert("batchSize".to_string(), json!(response.batch.limit));
    args.insert("offset".to_string(), json!(next_offset));
    if !use_cache {
        args.insert("useCache".to_string(), json!(false));
    }
    Some(ToolNextAction {
        tool: "scan".to_string(),
        args: Value::Object(args),
        reason: format!(
            "Fetch entries {next_offset}.. of {}",
            response.batch.total_count
        ),
    })
}

pub(in crate::tools::dispatch) async fn scan(
    service: &DirscopeService,
    request: ScanToolRequest,
) -> CallToolResult {
    let request = match request.into_scan_request() {
        Ok(request) => request,
        Err(err) => return invalid_argument(err),
    };
    let directory = request.directory.clone();
    let max_depth = request.filters.max_depth();
    let batch_size = request.batch_size;
    let use_cache = request.use_cache;

    match service
        .run_blocking(move |lister| lister.scan(&request))
        .await
    {
        Ok(mut response) => {
            let next_page = next_page_action(&response, use_cache);
            response.next_actions.extend(next_page);
            json_result(&response)
        }
        Err(err) => tool_error(
            err,
            CallContext {
                directory: Some(&directory),
                max_depth: Some(max_depth),
                batch_size: Some(batch_size),
            },
        ),
    }
}

pub(in crate::tools::dispatch) async fn scan_metadata_only(
    service: &DirscopeService,
    request: ScanToolRequest,
) -> CallToolResult {
    let request = match request.into_scan_request() {
        Ok(request) => request,
        Err(err) => return invalid_argument(err),
    };
    let directory = request.directory.clone();
    let max_depth = request.filters.max_depth();
    let batch_size = request.batch_size;

    match service
        .run_blocking(move |lister| lister.scan_metadata_only(&request))
        .await
    {
        Ok(response) => json_result(&response),
        Err(err) => tool_error(
            err,
            CallContext {
                directory: Some(&directory),
                max_depth: Some(max_depth),
                batch_size: Some(batch_size),
            },
        ),
    }
}
