//! Page request parameters and the response envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cursor::{Cursor, CursorError};

/// Page size applied when the client does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: usize = 100;

/// Query parameters accepted by paginated endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    cursor: Option<String>,
    limit: Option<usize>,
}

impl PageParams {
    /// Build parameters from an optional cursor and optional page size.
    pub const fn new(cursor: Option<String>, limit: Option<usize>) -> Self {
        Self { cursor, limit }
    }

    /// Effective page size, clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Raw cursor string as supplied by the client.
    pub fn raw_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|value| !value.trim().is_empty())
    }

    /// Decode the cursor into its keyset position.
    ///
    /// # Errors
    ///
    /// Propagates [`CursorError`] when the client supplied a malformed cursor.
    pub fn cursor<K>(&self) -> Result<Option<Cursor<K>>, CursorError>
    where
        K: DeserializeOwned,
    {
        self.raw_cursor().map(Cursor::decode).transpose()
    }
}

/// Navigation links rendered alongside a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationLinks {
    /// Link that reproduces the current page.
    #[serde(rename = "self")]
    pub self_link: String,
    /// Link to the following page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl PaginationLinks {
    /// Derive links from the request URL, replacing `cursor` and `limit`.
    pub fn from_request(
        request_url: &Url,
        params: &PageParams,
        next_cursor: Option<&str>,
    ) -> Self {
        let limit = params.limit();
        Self {
            self_link: with_page_query(request_url, params.raw_cursor(), limit),
            next: next_cursor.map(|cursor| with_page_query(request_url, Some(cursor), limit)),
        }
    }
}

fn with_page_query(request_url: &Url, cursor: Option<&str>, limit: usize) -> String {
    let mut url = request_url.clone();
    let retained: Vec<(String, String)> = request_url
        .query_pairs()
        .filter(|(key, _)| key != "cursor" && key != "limit")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(retained);
        if let Some(value) = cursor {
            pairs.append_pair("cursor", value);
        }
        pairs.append_pair("limit", &limit.to_string());
    }
    url.to_string()
}

/// Page envelope returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on this page, in the endpoint's documented order.
    pub data: Vec<T>,
    /// Page size that produced this page.
    pub limit: usize,
    /// Cursor for the following page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Navigation links, when the adapter knows the request URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<PaginationLinks>,
}

impl<T> Paginated<T> {
    /// Build an envelope without links.
    pub const fn new(data: Vec<T>, limit: usize, next_cursor: Option<String>) -> Self {
        Self {
            data,
            limit,
            next_cursor,
            links: None,
        }
    }

    /// Attach navigation links.
    #[must_use]
    pub fn with_links(mut self, links: PaginationLinks) -> Self {
        self.links = Some(links);
        self
    }

    /// Convert every item while keeping the paging metadata.
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            limit: self.limit,
            next_cursor: self.next_cursor,
            links: self.links,
        }
    }
}

/// Split a `limit + 1` fetch into the page and a flag for further rows.
///
/// Adapters over-fetch by one row to learn whether another page exists
/// without issuing a count query.
pub fn split_page<T>(mut items: Vec<T>, limit: usize) -> (Vec<T>, bool) {
    let has_more = items.len() > limit;
    items.truncate(limit);
    (items, has_more)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for page parameters and links.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default(None, DEFAULT_LIMIT)]
    #[case::zero(Some(0), 1)]
    #[case::within(Some(35), 35)]
    #[case::too_large(Some(10_000), MAX_LIMIT)]
    fn limit_is_clamped(#[case] requested: Option<usize>, #[case] expected: usize) {
        let params = PageParams::new(None, requested);
        assert_eq!(params.limit(), expected);
    }

    #[rstest]
    fn blank_cursor_is_treated_as_absent() -> Result<(), CursorError> {
        let params = PageParams::new(Some("  ".to_owned()), None);
        assert!(params.cursor::<i64>()?.is_none());
        Ok(())
    }

    #[rstest]
    fn split_page_reports_remaining_rows() {
        let (page, has_more) = split_page(vec![1, 2, 3], 2);
        assert_eq!(page, vec![1, 2]);
        assert!(has_more);

        let (page, has_more) = split_page(vec![1, 2], 2);
        assert_eq!(page, vec![1, 2]);
        assert!(!has_more);
    }

    #[rstest]
    fn links_replace_paging_parameters() -> Result<(), url::ParseError> {
        let url = Url::parse("https://example.test/api/v1/enrollments/sent?cursor=old&limit=5&x=1")?;
        let params = PageParams::new(Some("old".to_owned()), Some(5));
        let links = PaginationLinks::from_request(&url, &params, Some("next"));

        assert_eq!(
            links.self_link,
            "https://example.test/api/v1/enrollments/sent?x=1&cursor=old&limit=5"
        );
        assert_eq!(
            links.next.as_deref(),
            Some("https://example.test/api/v1/enrollments/sent?x=1&cursor=next&limit=5")
        );
        Ok(())
    }
}
