//! Constants shared across the proxy
//!
//! This module defines the fixed names, limits and user-facing messages used
//! by the gateway, the HTTP layer and the upstream client.

/// Conversation role constants
pub mod role {
    /// User role identifier
    pub const USER: &str = "user";
}

/// Upstream (generative language API) constants
pub mod upstream {
    /// Default upstream base URL
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

    /// Model used when the caller does not name one
    pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

    /// Method suffix appended to the model path segment
    pub const GENERATE_CONTENT: &str = "generateContent";

    /// Query parameter carrying the caller's credential
    pub const KEY_PARAM: &str = "key";
}

/// Request limits
pub mod limits {
    /// Maximum prompt length, in characters
    pub const MAX_PROMPT_CHARS: usize = 10_000;

    /// Maximum inbound request body size (10 MiB)
    pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

    /// Total upstream attempts per inbound request
    pub const MAX_ATTEMPTS: u32 = 3;
}

/// Route paths
pub mod path {
    /// Prefix gated by the rate limiter
    pub const API_PREFIX: &str = "/api";

    /// Generation proxy endpoint (relative to the prefix)
    pub const GEMINI: &str = "/gemini";

    /// Health endpoint (relative to the prefix)
    pub const HEALTH: &str = "/health";
}

/// Messages returned to callers
pub mod message {
    pub const PROMPT_REQUIRED: &str = "Prompt is required and must be a string";

    pub const PROMPT_TOO_LONG: &str = "Prompt too long (max 10,000 characters)";

    pub const API_KEY_REQUIRED: &str =
        "User API key is required. Please provide your Gemini API key in the frontend.";

    pub const INVALID_MODEL: &str = "Invalid model name";

    pub const PAYLOAD_TOO_LARGE: &str = "Request body too large (max 10mb)";

    pub const GENERATION_FAILED: &str = "Failed to generate content after multiple attempts";

    pub const NETWORK_ERROR: &str = "Network error while contacting the Gemini API";

    pub const INTERNAL_ERROR: &str = "Internal server error";

    pub const RATE_LIMITED: &str = "Too many requests from this IP, please try again later.";
}
