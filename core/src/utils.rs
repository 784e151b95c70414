//! Utility functions and types.

use std::fmt::Debug;

/// Debug wrapper that hides secrets such as account keys and SAS tokens.
///
/// Values shorter than 12 characters are fully masked. Longer values keep
/// their first and last three characters so two credentials can still be
/// told apart in logs.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let length = self.0.len();
        if length == 0 {
            f.write_str("EMPTY")
        } else if length < 12 || !self.0.is_char_boundary(3) || !self.0.is_char_boundary(length - 3)
        {
            f.write_str("***")
        } else {
            write!(f, "{}***{}", &self.0[..3], &self.0[length - 3..])
        }
    }
}
