use std::sync::Arc;

use azstore_core::{
    execute, lazy_segmented, messages, ContinuationKind, ContinuationToken, Context, Error,
    OperationContext, RequestOptions, Result, ResultSegment, SegmentedRequest, StorageUri,
};
use futures::Stream;
use log::debug;

use crate::constants::*;
use crate::request::{ListContainers, Target};
use crate::response::ContainerItem;
use crate::{BlobContainer, Credential, RequestSigner};

#[derive(Debug, Clone)]
pub(crate) struct ClientInner {
    pub ctx: Context,
    pub storage_uri: StorageUri,
    pub signer: RequestSigner,
    pub default_options: RequestOptions,
    pub delimiter: String,
}

/// Client of one storage account's blob service.
///
/// Cloning is cheap: clones share the same configuration.
///
/// ```no_run
/// use azstore_blob::{BlobServiceClient, Credential, PublicAccess};
/// use azstore_core::{Context, LocationMode, OperationContext, RequestOptions};
///
/// # async fn example(ctx: Context) -> azstore_core::Result<()> {
/// let client = BlobServiceClient::for_account(
///     ctx,
///     "myaccount",
///     Some(Credential::with_shared_key("myaccount", "a2V5")),
/// )?
/// .with_default_options(
///     RequestOptions::new().with_location_mode(LocationMode::PrimaryThenSecondary),
/// );
///
/// let mut container = client.container("logs")?;
/// let created = container
///     .create_if_not_exists(PublicAccess::Off, None, &mut OperationContext::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BlobServiceClient {
    inner: Arc<ClientInner>,
}

impl BlobServiceClient {
    /// Create a client for the service at `storage_uri`.
    ///
    /// Requests are sent anonymously when `credential` is `None`.
    pub fn new(ctx: Context, storage_uri: StorageUri, credential: Option<Credential>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                ctx,
                storage_uri,
                signer: RequestSigner::new(credential),
                default_options: RequestOptions::new(),
                delimiter: DEFAULT_DELIMITER.to_string(),
            }),
        }
    }

    /// Create a client for the public endpoints of `account_name`, secondary
    /// included.
    pub fn for_account(
        ctx: Context,
        account_name: &str,
        credential: Option<Credential>,
    ) -> Result<Self> {
        if account_name.is_empty() {
            return Err(Error::config_invalid(messages::format(
                messages::ARGUMENT_NULL_OR_EMPTY,
                &[&"account_name"],
            )));
        }

        let storage_uri = StorageUri::parse(
            &format!("https://{account_name}.blob.core.windows.net"),
            Some(&format!(
                "https://{account_name}-secondary.blob.core.windows.net"
            )),
        )?;
        Ok(Self::new(ctx, storage_uri, credential))
    }

    /// Create a client configured by the environment of `ctx`.
    ///
    /// `AZBLOB_ENDPOINT` names the primary endpoint, falling back to the
    /// public endpoints of `AZURE_STORAGE_ACCOUNT_NAME`. The credential is
    /// loaded by [`Credential::from_env`].
    pub fn from_env(ctx: Context) -> Result<Self> {
        let credential = Credential::from_env(&ctx);

        if let Some(endpoint) = ctx.env_var(AZBLOB_ENDPOINT) {
            debug!("using blob endpoint {endpoint} from env");
            let storage_uri = StorageUri::parse(&endpoint, None)?;
            return Ok(Self::new(ctx, storage_uri, credential));
        }

        match ctx.env_var(AZURE_STORAGE_ACCOUNT_NAME) {
            Some(account_name) => Self::for_account(ctx, &account_name, credential),
            None => Err(Error::config_invalid(format!(
                "neither {AZBLOB_ENDPOINT} nor {AZURE_STORAGE_ACCOUNT_NAME} is set"
            ))),
        }
    }

    /// Set the options every call starts from.
    pub fn with_default_options(mut self, options: RequestOptions) -> Self {
        Arc::make_mut(&mut self.inner).default_options = options;
        self
    }

    /// Set the delimiter of hierarchical blob listings, `/` by default.
    pub fn with_directory_delimiter(mut self, delimiter: &str) -> Self {
        Arc::make_mut(&mut self.inner).delimiter = delimiter.to_string();
        self
    }

    /// Service endpoints.
    pub fn storage_uri(&self) -> &StorageUri {
        &self.inner.storage_uri
    }

    /// Options every call starts from.
    pub fn default_options(&self) -> &RequestOptions {
        &self.inner.default_options
    }

    /// Delimiter of hierarchical blob listings.
    pub fn directory_delimiter(&self) -> &str {
        &self.inner.delimiter
    }

    /// Credential requests are signed with.
    pub fn credential(&self) -> Option<&Credential> {
        self.inner.signer.credential()
    }

    /// Reference a container of this account. Nothing is sent.
    pub fn container(&self, name: &str) -> Result<BlobContainer> {
        BlobContainer::new(self.inner.clone(), name)
    }

    /// List one page of containers.
    ///
    /// A `token` must come from a previous container listing. The page is
    /// read from the location that produced the token.
    pub async fn list_containers_segmented(
        &self,
        prefix: Option<&str>,
        include_metadata: bool,
        max_results: Option<u32>,
        token: Option<&ContinuationToken>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<ResultSegment<ContainerItem>> {
        ContinuationToken::assert_kind(token, ContinuationKind::Container)?;

        let options = options
            .unwrap_or(&RequestOptions::new())
            .apply_defaults(&self.inner.default_options);
        let request = ListContainers {
            target: Target {
                uri: &self.inner.storage_uri,
                signer: &self.inner.signer,
            },
            prefix,
            include_metadata,
            max_results,
            token,
        };

        execute(&self.inner.ctx, &request, &options, op_ctx).await
    }

    /// List all containers lazily.
    ///
    /// Pages are fetched as the stream is polled, each with a fresh
    /// [`OperationContext`].
    pub fn list_containers<'a>(
        &'a self,
        prefix: Option<&'a str>,
        include_metadata: bool,
        options: Option<&'a RequestOptions>,
    ) -> impl Stream<Item = Result<ContainerItem>> + 'a {
        lazy_segmented(
            SegmentedRequest::default(),
            move |req: SegmentedRequest| async move {
                let mut op_ctx = OperationContext::new();
                self.list_containers_segmented(
                    prefix,
                    include_metadata,
                    None,
                    req.token(),
                    options,
                    &mut op_ctx,
                )
                .await
            },
        )
    }
}
