use super::super::{json_result, CallToolResult, DirscopeService};
use super::error::{invalid_argument, tool_error, CallContext};
use crate::tools::schemas::pagination::PaginationInfoRequest;
use crate::tools::schemas::{clamp_batch_size, unsorted_filters};

/// Plans a paged listing; always walks, never served from cache.
pub(in crate::tools::dispatch) async fn pagination_info(
    service: &DirscopeService,
    request: PaginationInfoRequest,
) -> CallToolResult {
    let filters = match unsorted_filters(
        request.max_depth,
        request.include_hidden,
        request.file_types.as_deref(),
    ) {
        Ok(filters) => filters,
        Err(err) => return invalid_argument(err),
    };
    let batch_size = clamp_batch_size(request.batch_size);
    let max_depth = filters.max_depth();
    let directory = request.directory;
    let walked = directory.clone();

    match service
        .run_blocking(move |lister| lister.pagination_info(&walked, &filters, batch_size))
        .await
    {
        Ok(info) => json_result(&info),
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
