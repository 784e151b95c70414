use std::future::Future;

use futures::stream::{self, Stream, TryStreamExt};

use crate::{Error, Result, ResultSegment, SegmentedRequest};

/// Turn a page fetcher into a lazy stream of items.
///
/// `fetch` receives the current [`SegmentedRequest`] and returns the page it
/// designates, usually by calling [`execute`](crate::execute) once. Pages are
/// fetched only when the consumer polls past the last item of the previous
/// page; nothing is read ahead. The stream ends after a page without
/// continuation token, or right after yielding the first error.
///
/// ```
/// use azstore_core::{lazy_segmented, ResultSegment, SegmentedRequest};
/// use futures::TryStreamExt;
///
/// # async fn example() -> azstore_core::Result<()> {
/// let items: Vec<u32> = lazy_segmented(SegmentedRequest::default(), |_req| async {
///     Ok(ResultSegment::new(vec![1, 2, 3], None, None))
/// })
/// .try_collect()
/// .await?;
/// assert_eq!(items, vec![1, 2, 3]);
/// # Ok(())
/// # }
/// ```
pub fn lazy_segmented<T, F, Fut>(
    initial: SegmentedRequest,
    fetch: F,
) -> impl Stream<Item = Result<T>>
where
    F: FnMut(SegmentedRequest) -> Fut,
    Fut: Future<Output = Result<ResultSegment<T>>>,
{
    stream::try_unfold((Some(initial), fetch), |(state, mut fetch)| async move {
        let Some(request) = state else {
            return Ok(None);
        };

        let (items, token) = fetch(request).await?.into_parts();
        let next = token.map(|token| SegmentedRequest::new(Some(token)));

        let page = stream::iter(items.into_iter().map(Ok));
        Ok::<_, Error>(Some((page, (next, fetch))))
    })
    .try_flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContinuationKind, ContinuationToken};
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Pages keyed by the marker that requests them, `""` for the first one.
    fn pages() -> HashMap<String, ResultSegment<&'static str>> {
        let token = |m: &str| Some(ContinuationToken::new(m, ContinuationKind::Blob));
        HashMap::from([
            (
                "".to_string(),
                ResultSegment::new(vec!["a", "b"], Some(2), token("m1")),
            ),
            (
                "m1".to_string(),
                ResultSegment::new(vec!["c", "d"], Some(2), token("m2")),
            ),
            (
                "m2".to_string(),
                ResultSegment::new(vec!["e"], Some(2), None),
            ),
        ])
    }

    fn fetcher(
        calls: Arc<Mutex<Vec<String>>>,
    ) -> impl FnMut(SegmentedRequest) -> futures::future::Ready<Result<ResultSegment<&'static str>>>
    {
        let pages = pages();
        move |req| {
            let marker = req
                .token()
                .map(|t| t.next_marker().to_string())
                .unwrap_or_default();
            calls.lock().unwrap().push(marker.clone());
            futures::future::ready(
                pages
                    .get(&marker)
                    .cloned()
                    .ok_or_else(|| Error::unexpected(format!("no page for {marker}"))),
            )
        }
    }

    #[tokio::test]
    async fn test_yields_in_page_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let items: Vec<_> = lazy_segmented(SegmentedRequest::default(), fetcher(calls.clone()))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, vec!["a", "b", "c", "d", "e"]);
        // The last page has no token: no fourth fetch.
        assert_eq!(*calls.lock().unwrap(), vec!["", "m1", "m2"]);
    }

    #[tokio::test]
    async fn test_no_read_ahead() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let stream = lazy_segmented(SegmentedRequest::default(), fetcher(calls.clone()));
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next().await.unwrap().unwrap(), "b");
        assert_eq!(calls.lock().unwrap().len(), 1);

        assert_eq!(stream.next().await.unwrap().unwrap(), "c");
        assert_eq!(calls.lock().unwrap().len(), 2);

        drop(stream);
        assert_eq!(*calls.lock().unwrap(), vec!["", "m1"]);
    }

    #[tokio::test]
    async fn test_resume_from_token() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let start = SegmentedRequest::new(Some(ContinuationToken::new(
            "m1",
            ContinuationKind::Blob,
        )));
        let items: Vec<_> = lazy_segmented(start, fetcher(calls.clone()))
            .try_collect()
            .await
            .unwrap();

        // Resuming yields exactly the tail of the full listing.
        assert_eq!(items, vec!["c", "d", "e"]);
        assert_eq!(*calls.lock().unwrap(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let stream = lazy_segmented(SegmentedRequest::default(), |_req| async {
            Err::<ResultSegment<u8>, _>(Error::network("connection reset"))
        });
        futures::pin_mut!(stream);

        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
