//! Lazy paginated sequences over remote listings.
//!
//! [`paginate`] turns a "fetch page N" function into a stream that requests
//! the next page only when polled and stops after a page without a
//! continuation token. Calling it again starts over from the first page.

use futures_util::stream::{self, Stream, TryStreamExt};
use std::future::Future;

use super::models::Page;
use crate::errors::AppError;

enum Cursor {
    Start,
    Next(String),
    Exhausted,
}

pub fn paginate<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<Page<T>, AppError>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, AppError>>,
{
    stream::try_unfold((fetch, Cursor::Start), |(mut fetch, cursor)| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Exhausted => return Ok(None),
        };

        let page = fetch(token).await?;
        let next = match page.next_page_token.as_deref() {
            Some(token) if !token.is_empty() => Cursor::Next(token.to_string()),
            _ => Cursor::Exhausted,
        };

        Ok(Some((page, (fetch, next))))
    })
}

/// Drain every page, failing on the first page error.
pub async fn collect_all<T, S>(pages: S) -> Result<Vec<T>, AppError>
where
    S: Stream<Item = Result<Page<T>, AppError>>,
{
    pages
        .try_fold(Vec::new(), |mut acc, page| async move {
            acc.extend(page.items);
            Ok(acc)
        })
        .await
}
