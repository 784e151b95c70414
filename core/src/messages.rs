//! Canonical message templates for local precondition failures.
//!
//! Templates use `%s` placeholders, filled in order by [`format`].

/// Argument must be present and non-empty.
pub const ARGUMENT_NULL_OR_EMPTY: &str =
    "The argument must not be null or an empty string. Argument name: %s.";
/// Argument outside its accepted range.
pub const ARGUMENT_OUT_OF_RANGE_ERROR: &str =
    "The argument is out of range. Argument name: %s, Value passed: %s.";
/// Access level header holds an unknown value.
pub const INVALID_ACL_ACCESS_TYPE: &str =
    "Invalid acl public access type returned '%s'. Expected blob or container.";
/// Response body could not be parsed.
pub const INVALID_RESPONSE_RECEIVED: &str =
    "The response received is invalid or improperly formatted.";
/// Primary-only operation asked to run on secondary.
pub const PRIMARY_ONLY_COMMAND: &str =
    "This operation can only be executed against the primary storage location.";
/// Secondary-only operation asked to run on primary.
pub const SECONDARY_ONLY_COMMAND: &str =
    "This operation can only be executed against the secondary storage location.";
/// Snapshots requested in a hierarchical listing.
pub const SNAPSHOT_LISTING_ERROR: &str = "Listing snapshots is only supported in flat mode (no delimiter). Consider setting use_flat_blob_listing to true.";
/// Location mode reaches an endpoint that is not configured.
pub const STORAGE_URI_MISSING_LOCATION: &str = "The URI for the target storage location is not specified. Please consider changing the request's location mode.";
/// Continuation token belongs to another listing.
pub const UNEXPECTED_CONTINUATION_TYPE: &str = "The continuation type passed in is unexpected. Please verify that the correct continuation type is passed in. Expected {%s}, found {%s}.";
/// Fallback message for a failed response without details.
pub const UNEXPECTED_STATUS_CODE_RECEIVED: &str = "Unexpected http status code received.";

/// Fill the `%s` placeholders of `template` with `args`, left to right.
///
/// Surplus placeholders are left untouched, surplus arguments are ignored.
pub fn format(template: &str, args: &[&dyn std::fmt::Display]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut args = args.iter();
    let mut rest = template;

    while let Some(idx) = rest.find("%s") {
        out.push_str(&rest[..idx]);
        match args.next() {
            Some(arg) => out.push_str(&arg.to_string()),
            None => out.push_str("%s"),
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);

    out
}
