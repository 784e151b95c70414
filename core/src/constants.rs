// Headers shared by every storage service.
pub const X_MS_CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";
pub const X_MS_REQUEST_ID: &str = "x-ms-request-id";
pub const X_MS_ERROR_CODE: &str = "x-ms-error-code";

/// Query parameter carrying the server-side timeout in seconds.
pub const QUERY_TIMEOUT: &str = "timeout";
