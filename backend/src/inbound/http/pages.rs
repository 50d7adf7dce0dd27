//! Page envelope shared by list endpoints.
//!
//! Services return [`Paginated`] without links; handlers attach `self` and
//! `next` links derived from the request URL before rendering.

use actix_web::HttpRequest;
use pagination::{PageParams, Paginated, PaginationLinks};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Navigation links for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageLinksBody {
    /// Link reproducing the current page.
    #[serde(rename = "self")]
    pub self_link: String,
    /// Link to the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl From<PaginationLinks> for PageLinksBody {
    fn from(value: PaginationLinks) -> Self {
        Self {
            self_link: value.self_link,
            next: value.next,
        }
    }
}

/// Page of items, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageBody<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Effective page size.
    pub limit: usize,
    /// Opaque cursor for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Navigation links.
    pub links: PageLinksBody,
}

/// Convert a service page into a response body with links for `req`.
pub(crate) fn page_body<T, U, F>(
    req: &HttpRequest,
    params: &PageParams,
    page: Paginated<T>,
    convert: F,
) -> PageBody<U>
where
    F: FnMut(T) -> U,
{
    let links = PaginationLinks::from_request(&req.full_url(), params, page.next_cursor.as_deref());
    let Paginated {
        data,
        limit,
        next_cursor,
        ..
    } = page;
    PageBody {
        data: data.into_iter().map(convert).collect(),
        limit,
        next_cursor,
        links: links.into(),
    }
}
