//! Endpoint defaults and recognized provider options.

/// The Chat Completions endpoint used when no override is given.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider option selecting an OpenAI organization. When set, the
/// request carries an `openai-organization` header.
pub const OPTION_ORGANIZATION: &str = "openai.organization";
