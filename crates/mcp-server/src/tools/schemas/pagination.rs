use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfoRequest {
    #[schemars(description = "Directory to plan a paged listing for.")]
    pub directory: String,

    #[schemars(description = "Batch size the plan is computed for (default 20, clamped to 5..=50).")]
    pub batch_size: Option<i64>,

    #[schemars(description = "Descent depth (default 1, max 3).")]
    pub max_depth: Option<i64>,

    #[schemars(description = "Include dot-prefixed entries (default false).")]
    pub include_hidden: Option<bool>,

    #[schemars(description = "Extension allowlist for files. Directories are always counted.")]
    pub file_types: Option<Vec<String>>,
}
