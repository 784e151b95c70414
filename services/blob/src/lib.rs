//! Azure Blob Storage binding for azstore.
//!
//! This crate drives the blob service through the azstore-core execution
//! engine: every operation is a request descriptor run with retries and
//! primary/secondary location selection.
//!
//! ## Quick Start
//!
//! ```no_run
//! use azstore_blob::{BlobListingDetails, BlobServiceClient};
//! use azstore_core::{Context, OsEnv};
//! use futures::TryStreamExt;
//!
//! # async fn example() -> azstore_core::Result<()> {
//! // Bring your own http client and timer, see azstore-http-send-reqwest
//! // and azstore-sleep-tokio.
//! let ctx = Context::new().with_env(OsEnv);
//! let client = BlobServiceClient::from_env(ctx)?;
//!
//! let container = client.container("logs")?;
//! let names: Vec<String> = container
//!     .list_blobs(Some("2024/"), true, BlobListingDetails::default(), None)?
//!     .map_ok(|item| item.name().to_string())
//!     .try_collect()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Credentials
//!
//! - Shared Key: `AZURE_STORAGE_ACCOUNT_NAME` and `AZURE_STORAGE_ACCOUNT_KEY`
//! - SAS token: `AZURE_STORAGE_SAS_TOKEN`
//! - Bearer token: `AZURE_STORAGE_BEARER_TOKEN`
//!
//! Requests are sent anonymously without any of them.

#![warn(missing_docs)]

mod constants;

mod credential;
pub use credential::Credential;
mod sign_request;
pub use sign_request::RequestSigner;

mod response;
pub use response::{BlobItem, ContainerItem, ContainerProperties, ListBlobItem, PublicAccess};
mod request;
pub use request::BlobListingDetails;
mod access_condition;
pub use access_condition::AccessCondition;
mod permissions;
pub use permissions::{BlobContainerPermissions, SharedAccessPermissions, SharedAccessPolicy};

mod client;
pub use client::BlobServiceClient;
mod container;
pub use container::BlobContainer;
