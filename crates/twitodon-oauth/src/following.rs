//! Cursor-based follow-list pagination.
//!
//! A [`PageSource`] fetches one page for a cursor. [`pages`] turns it into a
//! finite, lazily produced stream of batches and [`collect_all`] folds that
//! stream into a single list. Pages are fetched strictly one after another
//! because each cursor comes from the previous response.
//!
//! A failed page (rate limiting included) ends the stream early; whatever
//! was gathered before the failure is still returned.

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};

/// Entries requested per page.
pub const PAGE_SIZE: u32 = 1000;

/// One followed account, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEntry {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Any other fields the provider sent.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Result of fetching one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// A page of entries, with the cursor for the next page if there is one.
    Page {
        entries: Vec<FollowEntry>,
        next_cursor: Option<String>,
    },
    /// The provider reported no (more) results.
    Exhausted,
    /// The request failed; `status` is `None` for transport errors.
    Failed { status: Option<u16> },
}

/// Fetches single pages of a follow list.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> PageOutcome;
}

/// Stream the batches produced by `source`, in fetch order.
///
/// The stream ends after a page without a next cursor, on an exhausted
/// response, or on a failed request.
pub fn pages<S: PageSource>(source: S) -> impl Stream<Item = Vec<FollowEntry>> {
    // `None` once finished; `Some(None)` before the first page.
    let start: Option<Option<String>> = Some(None);

    stream::unfold((source, start), |(source, cursor)| async move {
        let cursor = cursor?;
        match source.fetch_page(cursor.as_deref()).await {
            PageOutcome::Page {
                entries,
                next_cursor,
            } => {
                let next = next_cursor.filter(|c| !c.is_empty()).map(Some);
                tracing::debug!(
                    count = entries.len(),
                    has_next = next.is_some(),
                    "Fetched following page"
                );
                Some((entries, (source, next)))
            }
            PageOutcome::Exhausted => None,
            PageOutcome::Failed { status } => {
                tracing::warn!(?status, "Following page failed, returning partial list");
                None
            }
        }
    })
}

/// Fetch every page from `source` and concatenate the entries in order.
///
/// Entries are not deduplicated.
pub async fn collect_all<S: PageSource>(source: S) -> Vec<FollowEntry> {
    pages(source)
        .fold(Vec::new(), |mut all, batch| async move {
            all.extend(batch);
            all
        })
        .await
}
