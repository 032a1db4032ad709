//! API constants

/// Prefix of every versioned route
pub const API_PREFIX: &str = "/api/v1";

/// Where the OpenAPI document is served
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Room for multipart boundaries and headers on top of the file size limit
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
