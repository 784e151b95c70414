//! Container access policies: public access level and stored access policies.
//!
//! - [Set Container ACL](https://learn.microsoft.com/en-us/rest/api/storageservices/set-container-acl)

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use azstore_core::time::{format_rfc3339, parse_rfc3339, DateTime};
use azstore_core::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::response::{parse_xml, PublicAccess};

/// Operations a shared access signature may allow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedAccessPermissions {
    /// Read blob content, properties and metadata.
    pub read: bool,
    /// Write blob content, properties and metadata.
    pub write: bool,
    /// Delete blobs.
    pub delete: bool,
    /// List blobs of the container.
    pub list: bool,
}

impl fmt::Display for SharedAccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, c) in [
            (self.read, 'r'),
            (self.write, 'w'),
            (self.delete, 'd'),
            (self.list, 'l'),
        ] {
            if on {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for SharedAccessPermissions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut perms = Self::default();
        for c in s.chars() {
            match c {
                'r' => perms.read = true,
                'w' => perms.write = true,
                'd' => perms.delete = true,
                'l' => perms.list = true,
                _ => {
                    return Err(Error::response_invalid(format!(
                        "invalid shared access permission {c:?} in {s:?}"
                    )))
                }
            }
        }
        Ok(perms)
    }
}

/// A stored access policy, referenced by id from shared access signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedAccessPolicy {
    /// Start of validity. The signature may set it instead.
    pub start: Option<DateTime>,
    /// End of validity. The signature may set it instead.
    pub expiry: Option<DateTime>,
    /// Allowed operations.
    pub permissions: SharedAccessPermissions,
}

/// Permissions of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobContainerPermissions {
    /// Anonymous access level.
    pub public_access: PublicAccess,
    /// Stored access policies keyed by their id.
    pub shared_access_policies: BTreeMap<String, SharedAccessPolicy>,
}

impl BlobContainerPermissions {
    /// Serialize the stored access policies into a `Set Container ACL` body.
    pub(crate) fn to_xml(&self) -> Result<Bytes> {
        let ids = SignedIdentifiers {
            items: self
                .shared_access_policies
                .iter()
                .map(|(id, policy)| SignedIdentifier {
                    id: id.clone(),
                    access_policy: AccessPolicy {
                        start: policy.start.map(format_rfc3339),
                        expiry: policy.expiry.map(format_rfc3339),
                        permission: policy.permissions.to_string(),
                    },
                })
                .collect(),
        };

        let body = quick_xml::se::to_string(&ids).map_err(|err| {
            Error::request_invalid("failed to serialize shared access policies").with_source(err)
        })?;
        Ok(Bytes::from(format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>{body}"
        )))
    }

    /// Parse the stored access policies of a `Get Container ACL` body.
    ///
    /// An empty body carries no policy.
    pub(crate) fn parse_policies(body: &Bytes) -> Result<BTreeMap<String, SharedAccessPolicy>> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(BTreeMap::new());
        }

        let ids: SignedIdentifiers = parse_xml(body)?;
        ids.items
            .into_iter()
            .map(|item| {
                let time = |v: Option<String>| {
                    v.filter(|v| !v.is_empty())
                        .map(|v| parse_rfc3339(&v))
                        .transpose()
                };
                let policy = SharedAccessPolicy {
                    start: time(item.access_policy.start)?,
                    expiry: time(item.access_policy.expiry)?,
                    permissions: item.access_policy.permission.parse()?,
                };
                Ok((item.id, policy))
            })
            .collect()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "SignedIdentifiers")]
struct SignedIdentifiers {
    #[serde(rename = "SignedIdentifier", default)]
    items: Vec<SignedIdentifier>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignedIdentifier {
    id: String,
    access_policy: AccessPolicy,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<String>,
    #[serde(default)]
    permission: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("", SharedAccessPermissions::default(); "none")]
    #[test_case("rl", SharedAccessPermissions { read: true, list: true, ..Default::default() }; "read list")]
    #[test_case("rwdl", SharedAccessPermissions { read: true, write: true, delete: true, list: true }; "all")]
    fn test_permissions_string(s: &str, perms: SharedAccessPermissions) {
        assert_eq!(s.parse::<SharedAccessPermissions>().unwrap(), perms);
        assert_eq!(perms.to_string(), s);
    }

    #[test]
    fn test_unknown_permission() {
        assert!("rx".parse::<SharedAccessPermissions>().is_err());
    }

    #[test]
    fn test_parse_policies() {
        let body = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>
<SignedIdentifiers>
    <SignedIdentifier>
        <Id>read-only</Id>
        <AccessPolicy>
            <Start>2022-03-01T08:12:34.0000000Z</Start>
            <Expiry>2022-03-02T08:12:34.0000000Z</Expiry>
            <Permission>rl</Permission>
        </AccessPolicy>
    </SignedIdentifier>
    <SignedIdentifier>
        <Id>writer</Id>
        <AccessPolicy>
            <Permission>w</Permission>
        </AccessPolicy>
    </SignedIdentifier>
</SignedIdentifiers>";
        let policies =
            BlobContainerPermissions::parse_policies(&Bytes::from_static(body.as_bytes()))
                .unwrap();

        assert_eq!(policies.len(), 2);
        assert_eq!(
            policies["read-only"],
            SharedAccessPolicy {
                start: Some(Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()),
                expiry: Some(Utc.with_ymd_and_hms(2022, 3, 2, 8, 12, 34).unwrap()),
                permissions: "rl".parse().unwrap(),
            }
        );
        assert_eq!(policies["writer"].start, None);
        assert!(policies["writer"].permissions.write);
    }

    #[test]
    fn test_parse_no_policies() {
        let empty = BlobContainerPermissions::parse_policies(&Bytes::new()).unwrap();
        assert!(empty.is_empty());

        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?><SignedIdentifiers />";
        let empty =
            BlobContainerPermissions::parse_policies(&Bytes::from_static(body.as_bytes()))
                .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_to_xml() {
        let permissions = BlobContainerPermissions {
            public_access: PublicAccess::Container,
            shared_access_policies: BTreeMap::from([(
                "read-only".to_string(),
                SharedAccessPolicy {
                    start: None,
                    expiry: Some(Utc.with_ymd_and_hms(2022, 3, 2, 8, 12, 34).unwrap()),
                    permissions: "rl".parse().unwrap(),
                },
            )]),
        };

        let body = permissions.to_xml().unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?><SignedIdentifiers>"));
        assert!(text.contains("<Id>read-only</Id>"), "{text}");
        assert!(text.contains("<Expiry>2022-03-02T08:12:34Z</Expiry>"), "{text}");
        assert!(text.contains("<Permission>rl</Permission>"), "{text}");
        assert!(!text.contains("<Start>"), "{text}");

        // What is sent is what the service hands back.
        let policies = BlobContainerPermissions::parse_policies(&body).unwrap();
        assert_eq!(policies, permissions.shared_access_policies);
    }
}
