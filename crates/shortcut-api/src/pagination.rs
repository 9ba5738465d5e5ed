//! Pagination helpers.
//!
//! Shortcut uses two schemes: search endpoints return a `next` cursor (a
//! path to the following page), list endpoints such as group stories take
//! `limit`/`offset`. Both collectors guarantee termination and never return
//! the same item twice, even if the server repeats a page.

use std::collections::HashSet;

use serde::Deserialize;
use shortcut_core::entity::StorySummary;

use crate::error::Result;

/// One page of a cursor-paginated search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage<T> {
    pub data: Vec<T>,

    /// Path (or URL) of the next page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub total: Option<u64>,
}

/// Items that carry a stable numeric id used for de-duplication.
pub trait Identified {
    fn id(&self) -> i64;
}

impl Identified for StorySummary {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Follows `next` cursors until the last page.
///
/// `fetch` is called with `None` for the first page and with the cursor for
/// every following page. A cursor seen twice ends the walk.
pub fn collect_cursor_pages<T, F>(mut fetch: F) -> Result<Vec<T>>
where
    T: Identified,
    F: FnMut(Option<&str>) -> Result<SearchPage<T>>,
{
    let mut items = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut seen_cursors = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.as_deref())?;
        pages += 1;
        for item in page.data {
            if seen_ids.insert(item.id()) {
                items.push(item);
            }
        }
        tracing::debug!(
            "fetched page {} ({} items so far, total {:?})",
            pages,
            items.len(),
            page.total
        );

        match page.next.filter(|n| !n.is_empty()) {
            Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
            Some(next) => {
                tracing::warn!("pagination cursor {} repeated; stopping", next);
                break;
            }
            None => break,
        }
    }

    Ok(items)
}

/// Walks `limit`/`offset` pages until a short page.
///
/// `fetch` receives `(offset, limit)`. A full page that adds no new item
/// also ends the walk, so a server ignoring `offset` cannot loop forever.
pub fn collect_offset_pages<T, F>(limit: usize, mut fetch: F) -> Result<Vec<T>>
where
    T: Identified,
    F: FnMut(usize, usize) -> Result<Vec<T>>,
{
    let limit = limit.max(1);
    let mut items = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut offset = 0;

    loop {
        let page = fetch(offset, limit)?;
        let len = page.len();
        let mut added = 0;
        for item in page {
            if seen_ids.insert(item.id()) {
                items.push(item);
                added += 1;
            }
        }
        if len < limit || added == 0 {
            break;
        }
        offset += len;
    }

    Ok(items)
}

/// Turns a `next` cursor into an absolute URL.
///
/// Shortcut returns paths such as `/api/v3/search/stories?next=...`, which
/// are relative to the API origin rather than to the base URL.
pub fn resolve_next(base_url: &str, next: &str) -> String {
    if next.starts_with("http://") || next.starts_with("https://") {
        return next.to_string();
    }
    if next.starts_with('/') {
        return format!("{}{}", origin(base_url), next);
    }
    format!("{}/{}", base_url.trim_end_matches('/'), next)
}

/// `scheme://host[:port]` part of a URL.
fn origin(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url.trim_end_matches('/');
    };
    let after = scheme_end + 3;
    match url[after..].find('/') {
        Some(slash) => &url[..after + slash],
        None => url,
    }
}
