use super::super::{json_result, CallToolResult, DirscopeService};
use super::error::{invalid_argument, tool_error, CallContext};
use crate::tools::schemas::stream::{
    StreamNextRequest, StreamNextResult, StreamStartRequest, StreamStartResult, StreamStopRequest,
    StreamStopResult,
};
use crate::tools::schemas::{clamp_batch_size, unsorted_filters};

pub(in crate::tools::dispatch) async fn stream_start(
    service: &DirscopeService,
    request: StreamStartRequest,
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
    let StreamStartRequest {
        directory,
        stream_id,
        ..
    } = request;
    let raw_directory = directory.clone();

    let started = service
        .run_blocking(move |lister| {
            lister.stream_start(&directory, filters, stream_id.as_deref(), batch_size)
        })
        .await;

    match started {
        Ok(opened) => json_result(&StreamStartResult {
            stream_id: opened.first_batch.stream_id.clone(),
            directory: opened.directory,
            first_batch: opened.first_batch.into(),
        }),
        Err(err) => tool_error(
            err,
            CallContext {
                directory: Some(&raw_directory),
                max_depth: Some(max_depth),
                batch_size: Some(batch_size),
            },
        ),
    }
}

pub(in crate::tools::dispatch) async fn stream_next(
    service: &DirscopeService,
    request: StreamNextRequest,
) -> CallToolResult {
    let batch_size = clamp_batch_size(request.batch_size);
    let stream_id = request.stream_id;

    match service
        .run_blocking(move |lister| lister.stream_next(&stream_id, batch_size))
        .await
    {
        Ok(batch) => json_result(&StreamNextResult {
            stream_id: batch.stream_id.clone(),
            batch: batch.into(),
        }),
        Err(err) => tool_error(
            err,
            CallContext {
                batch_size: Some(batch_size),
                ..CallContext::default()
            },
        ),
    }
}

pub(in crate::tools::dispatch) async fn stream_stop(
    service: &DirscopeService,
    request: StreamStopRequest,
) -> CallToolResult {
    let stream_id = request.stream_id;

    match service
        .run_blocking(move |lister| lister.stream_stop(&stream_id))
        .await
    {
        Ok(stopped) => json_result(&StreamStopResult::from(stopped)),
        Err(err) => tool_error(err, CallContext::default()),
    }
}
