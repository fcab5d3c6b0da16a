use dirscope_lister::{FileEntry, StreamBatch, StreamStopped};
use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamStartRequest {
    #[schemars(
        description = "Directory to walk: absolute, relative to the server working directory, or ~-prefixed."
    )]
    pub directory: String,

    #[schemars(description = "Entries in the first batch (default 20, clamped to 5..=50).")]
    pub batch_size: Option<i64>,

    #[schemars(description = "Descent depth (default 1, max 3).")]
    pub max_depth: Option<i64>,

    #[schemars(description = "Include dot-prefixed entries (default false).")]
    pub include_hidden: Option<bool>,

    #[schemars(description = "Extension allowlist for files. Directories are always listed.")]
    pub file_types: Option<Vec<String>>,

    #[schemars(
        description = "Optional caller-chosen stream id. Must not be active or previously stopped; omit to get a generated id."
    )]
    pub stream_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamNextRequest {
    #[schemars(description = "Stream id returned by stream_start.")]
    pub stream_id: String,

    #[schemars(description = "Entries to pull (default 20, clamped to 5..=50).")]
    pub batch_size: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamStopRequest {
    #[schemars(description = "Stream id returned by stream_start.")]
    pub stream_id: String,
}

/// Entries in walk order; streams are never sorted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPage {
    pub entries: Vec<FileEntry>,
    pub entries_emitted: usize,
    pub has_more: bool,
}

impl From<StreamBatch> for StreamPage {
    fn from(batch: StreamBatch) -> Self {
        Self {
            entries: batch.entries,
            entries_emitted: batch.entries_emitted,
            has_more: batch.has_more,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStartResult {
    pub stream_id: String,
    pub directory: String,
    pub first_batch: StreamPage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamNextResult {
    pub stream_id: String,
    pub batch: StreamPage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStopResult {
    pub ack: bool,
    pub stream_id: String,
    pub entries_emitted: usize,
    pub duration_secs: f64,
}

impl From<StreamStopped> for StreamStopResult {
    fn from(stopped: StreamStopped) -> Self {
        Self {
            ack: true,
            stream_id: stopped.stream_id,
            entries_emitted: stopped.entries_emitted,
            duration_secs: stopped.duration_secs,
        }
    }
}
