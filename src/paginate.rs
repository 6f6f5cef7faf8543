//! Rate-limited page fetch loop.
//!
//! Mattermost lists channel members in fixed-size pages and signals the end
//! of the sequence with an empty page. The loop here is deliberately serial:
//! one page at a time with a configurable pause after each fetch, which is
//! this tool's only concession to upstream rate limits.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Fetch every item of a paginated listing.
///
/// Calls `fetch(page, page_size)` with an incrementing page index until it
/// returns an empty batch, sleeping `delay` after each non-terminal page.
/// Any error from `fetch` propagates immediately — there is no retry here;
/// the caller decides whether the failure isolates a channel or aborts.
///
/// # Errors
///
/// Returns the first error produced by `fetch`.
pub async fn fetch_all<T, F, Fut>(page_size: u32, delay: Duration, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut page = 0u32;
    loop {
        let batch = fetch(page, page_size).await?;
        if batch.is_empty() {
            break;
        }
        items.extend(batch);
        page += 1;
        tokio::time::sleep(delay).await;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapError;
    use std::cell::Cell;

    #[tokio::test]
    async fn collects_pages_until_empty_batch() {
        let calls = Cell::new(0u32);
        let members: Vec<u32> = (0..250).collect();

        let items = fetch_all(200, Duration::ZERO, |page, per_page| {
            calls.set(calls.get() + 1);
            let start = (page * per_page) as usize;
            let batch: Vec<u32> = members
                .iter()
                .skip(start)
                .take(per_page as usize)
                .copied()
                .collect();
            async move { Ok(batch) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 250);
        assert_eq!(items[200], 200);
        // Pages of 200 and 50, then the empty page that terminates the loop.
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn empty_listing_makes_one_call() {
        let calls = Cell::new(0u32);

        let items: Vec<u32> = fetch_all(200, Duration::ZERO, |_page, _per_page| {
            calls.set(calls.get() + 1);
            async move { Ok(Vec::new()) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn fetch_error_propagates() {
        let result: Result<Vec<u32>> = fetch_all(200, Duration::ZERO, |page, _per_page| {
            async move {
                if page == 0 {
                    Ok(vec![1, 2, 3])
                } else {
                    Err(SnapError::api_status("/members", 429))
                }
            }
        })
        .await;

        assert!(matches!(result, Err(SnapError::ApiStatus { status: 429, .. })));
    }
}
