use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Headers
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const X_MS_META_PREFIX: &str = "x-ms-meta-";
pub const X_MS_BLOB_PUBLIC_ACCESS: &str = "x-ms-blob-public-access";
pub const X_MS_LEASE_STATUS: &str = "x-ms-lease-status";
pub const X_MS_LEASE_STATE: &str = "x-ms-lease-state";
pub const X_MS_LEASE_DURATION: &str = "x-ms-lease-duration";
pub const X_MS_LEASE_ID: &str = "x-ms-lease-id";
pub const X_MS_LEASE_ACTION: &str = "x-ms-lease-action";
pub const X_MS_LEASE_BREAK_PERIOD: &str = "x-ms-lease-break-period";
pub const X_MS_LEASE_TIME: &str = "x-ms-lease-time";
pub const X_MS_PROPOSED_LEASE_ID: &str = "x-ms-proposed-lease-id";

/// Service version every request is sent with.
pub const STORAGE_VERSION: &str = "2021-08-06";

// Env values used in azstore-blob
pub const AZURE_STORAGE_ACCOUNT_NAME: &str = "AZURE_STORAGE_ACCOUNT_NAME";
pub const AZURE_STORAGE_ACCOUNT_KEY: &str = "AZURE_STORAGE_ACCOUNT_KEY";
pub const AZURE_STORAGE_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";
pub const AZURE_STORAGE_BEARER_TOKEN: &str = "AZURE_STORAGE_BEARER_TOKEN";
pub const AZBLOB_ENDPOINT: &str = "AZBLOB_ENDPOINT";

// Lease limits, in seconds
pub const MIN_LEASE_DURATION: u32 = 15;
pub const MAX_LEASE_DURATION: u32 = 60;
pub const MAX_LEASE_BREAK_PERIOD: u32 = 60;

/// Delimiter used by hierarchical listings unless configured otherwise.
pub const DEFAULT_DELIMITER: &str = "/";

// Service error codes
pub const CONTAINER_ALREADY_EXISTS: &str = "ContainerAlreadyExists";
pub const CONTAINER_NOT_FOUND: &str = "ContainerNotFound";
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFound";

/// Characters escaped in container and blob names placed in a path.
pub static PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
