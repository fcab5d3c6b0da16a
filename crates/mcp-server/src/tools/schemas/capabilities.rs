use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesRequest {
    /// Directory to fill into the suggested first call
    #[schemars(
        description = "Directory to prefill into the suggested start route (optional; defaults to the server working directory)."
    )]
    pub directory: Option<String>,
}
