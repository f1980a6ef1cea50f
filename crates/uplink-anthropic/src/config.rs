//! Endpoint defaults and recognized provider options.

/// The Messages API endpoint used when no override is given.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// The `anthropic-version` header sent unless overridden.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Provider option overriding the `anthropic-version` header.
pub const OPTION_API_VERSION: &str = "anthropic.api_version";
