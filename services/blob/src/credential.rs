use std::fmt::{Debug, Formatter};

use azstore_core::time::{now, DateTime};
use azstore_core::utils::Redact;
use azstore_core::Context;
use log::debug;

use crate::constants::*;

/// Credential enum for the ways a blob request can be authorized.
#[derive(Clone)]
pub enum Credential {
    /// Shared Key authentication with account name and key
    SharedKey {
        /// Azure storage account name.
        account_name: String,
        /// Azure storage account key, base64 encoded.
        account_key: String,
    },
    /// SAS (Shared Access Signature) token authentication
    SasToken {
        /// SAS token, without the leading `?`.
        token: String,
    },
    /// Bearer token for OAuth authentication
    BearerToken {
        /// Bearer token.
        token: String,
        /// Expiration time for this credential.
        expires_in: Option<DateTime>,
    },
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("Credential::SharedKey")
                .field("account_name", &Redact::from(account_name))
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::SasToken { token } => f
                .debug_struct("Credential::SasToken")
                .field("token", &Redact::from(token))
                .finish(),
            Credential::BearerToken { token, expires_in } => f
                .debug_struct("Credential::BearerToken")
                .field("token", &Redact::from(token))
                .field("expires_in", expires_in)
                .finish(),
        }
    }
}

impl Credential {
    /// Create a shared key credential.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Self {
        Credential::SharedKey {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }

    /// Create a SAS token credential. A leading `?` is dropped.
    pub fn with_sas_token(token: &str) -> Self {
        Credential::SasToken {
            token: token.trim_start_matches('?').to_string(),
        }
    }

    /// Create a bearer token credential.
    pub fn with_bearer_token(token: &str, expires_in: Option<DateTime>) -> Self {
        Credential::BearerToken {
            token: token.to_string(),
            expires_in,
        }
    }

    /// Whether the credential can still sign requests.
    ///
    /// Bearer tokens are considered expired 20 seconds ahead of time.
    pub fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => !account_name.is_empty() && !account_key.is_empty(),
            Credential::SasToken { token } => !token.is_empty(),
            Credential::BearerToken { token, expires_in } => {
                if token.is_empty() {
                    return false;
                }
                match expires_in {
                    Some(expires_in) => *expires_in > now() + chrono::TimeDelta::seconds(20),
                    None => true,
                }
            }
        }
    }

    /// Load a credential from the environment of `ctx`.
    ///
    /// A shared key wins over a SAS token, which wins over a bearer token.
    /// Returns `None` when none of them is configured.
    pub fn from_env(ctx: &Context) -> Option<Self> {
        let account_name = ctx.env_var(AZURE_STORAGE_ACCOUNT_NAME);

        if let (Some(account_name), Some(account_key)) =
            (account_name, ctx.env_var(AZURE_STORAGE_ACCOUNT_KEY))
        {
            debug!("loaded shared key credential from env");
            return Some(Credential::with_shared_key(&account_name, &account_key));
        }

        if let Some(token) = ctx.env_var(AZURE_STORAGE_SAS_TOKEN) {
            debug!("loaded sas token credential from env");
            return Some(Credential::with_sas_token(&token));
        }

        ctx.env_var(AZURE_STORAGE_BEARER_TOKEN).map(|token| {
            debug!("loaded bearer token credential from env");
            Credential::with_bearer_token(&token, None)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azstore_core::StaticEnv;
    use std::collections::HashMap;

    fn ctx(envs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[test]
    fn test_from_env_shared_key() {
        let cred = Credential::from_env(&ctx(&[
            (AZURE_STORAGE_ACCOUNT_NAME, "acct"),
            (AZURE_STORAGE_ACCOUNT_KEY, "a2V5"),
            (AZURE_STORAGE_SAS_TOKEN, "sv=2021"),
        ]))
        .unwrap();

        assert!(matches!(
            cred,
            Credential::SharedKey { ref account_name, .. } if account_name == "acct"
        ));
    }

    #[test]
    fn test_from_env_sas_token() {
        // An account name without key doesn't make a shared key.
        let cred = Credential::from_env(&ctx(&[
            (AZURE_STORAGE_ACCOUNT_NAME, "acct"),
            (AZURE_STORAGE_SAS_TOKEN, "?sv=2021&sig=abc"),
        ]))
        .unwrap();

        assert!(matches!(
            cred,
            Credential::SasToken { ref token } if token == "sv=2021&sig=abc"
        ));
    }

    #[test]
    fn test_from_env_empty() {
        assert!(Credential::from_env(&ctx(&[])).is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let cred = Credential::with_shared_key("myaccount", "c2VjcmV0c2VjcmV0c2VjcmV0");
        let s = format!("{cred:?}");
        assert!(!s.contains("c2VjcmV0c2VjcmV0c2VjcmV0"), "{s}");
        assert!(s.contains("c2V***mV0"), "{s}");
    }

    #[test]
    fn test_bearer_token_expiry() {
        let expired = Credential::with_bearer_token("token", Some(now()));
        assert!(!expired.is_valid());

        let fresh =
            Credential::with_bearer_token("token", Some(now() + chrono::TimeDelta::hours(1)));
        assert!(fresh.is_valid());
    }
}
