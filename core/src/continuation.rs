use std::fmt;

use crate::messages;
use crate::{Error, Result, StorageLocation};

/// Which listing operation a continuation token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContinuationKind {
    /// Blobs of a container.
    Blob,
    /// Containers of an account.
    Container,
    /// Queues of an account.
    Queue,
    /// Tables or entities of an account.
    Table,
    /// File shares of an account.
    Share,
    /// Files and directories of a share.
    File,
}

impl fmt::Display for ContinuationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContinuationKind::Blob => "Blob",
            ContinuationKind::Container => "Container",
            ContinuationKind::Queue => "Queue",
            ContinuationKind::Table => "Table",
            ContinuationKind::Share => "Share",
            ContinuationKind::File => "File",
        };
        f.write_str(s)
    }
}

/// Opaque cursor to resume a listing where a previous page stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken {
    next_marker: String,
    kind: ContinuationKind,
    target_location: Option<StorageLocation>,
}

impl ContinuationToken {
    /// Create a token for `kind` resuming at `next_marker`.
    pub fn new(next_marker: impl Into<String>, kind: ContinuationKind) -> Self {
        Self {
            next_marker: next_marker.into(),
            kind,
            target_location: None,
        }
    }

    /// Record the location that produced this token.
    pub fn with_target_location(mut self, location: StorageLocation) -> Self {
        self.target_location = Some(location);
        self
    }

    /// Marker to send as the next page's `marker`.
    pub fn next_marker(&self) -> &str {
        &self.next_marker
    }

    /// Listing operation this token belongs to.
    pub fn kind(&self) -> ContinuationKind {
        self.kind
    }

    /// Location that returned this token.
    pub fn target_location(&self) -> Option<StorageLocation> {
        self.target_location
    }

    /// Fail with a usage error if `token` belongs to another listing.
    ///
    /// A missing token is always accepted: it means "first page".
    pub fn assert_kind(token: Option<&ContinuationToken>, expected: ContinuationKind) -> Result<()> {
        match token {
            Some(token) if token.kind != expected => Err(Error::request_invalid(
                messages::format(
                    messages::UNEXPECTED_CONTINUATION_TYPE,
                    &[&expected, &token.kind],
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSegment<T> {
    results: Vec<T>,
    page_size: Option<u32>,
    continuation_token: Option<ContinuationToken>,
}

impl<T> ResultSegment<T> {
    /// Create a page.
    pub fn new(
        results: Vec<T>,
        page_size: Option<u32>,
        continuation_token: Option<ContinuationToken>,
    ) -> Self {
        Self {
            results,
            page_size,
            continuation_token,
        }
    }

    /// Items of this page, in service order.
    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Take the items out of the page.
    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    /// Page size that was requested, if any.
    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Token for the next page, `None` on the last page.
    pub fn continuation_token(&self) -> Option<&ContinuationToken> {
        self.continuation_token.as_ref()
    }

    /// Whether another page follows.
    pub fn has_more_results(&self) -> bool {
        self.continuation_token.is_some()
    }

    /// Split into items and token.
    pub fn into_parts(self) -> (Vec<T>, Option<ContinuationToken>) {
        (self.results, self.continuation_token)
    }
}

/// Continuation state of one listing in progress.
///
/// It is read before building each page's request and replaced after each
/// successful page. It must never be shared between two listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentedRequest {
    token: Option<ContinuationToken>,
}

impl SegmentedRequest {
    /// State for a listing starting at `token`, or at the beginning.
    pub fn new(token: Option<ContinuationToken>) -> Self {
        Self { token }
    }

    /// Current token.
    pub fn token(&self) -> Option<&ContinuationToken> {
        self.token.as_ref()
    }
}
