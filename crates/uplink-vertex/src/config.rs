//! Required provider options and endpoint construction.

/// Provider option naming the GCP region, e.g. `us-central1`.
pub const OPTION_REGION: &str = "vertex.region";

/// Provider option naming the GCP project id.
pub const OPTION_PROJECT: &str = "vertex.project";

/// The regional generateContent endpoint for a project.
pub(crate) fn endpoint(region: &str, project: &str) -> String {
    format!(
        "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models"
    )
}
