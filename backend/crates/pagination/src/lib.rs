//! Opaque cursor and pagination envelope primitives.
//!
//! Endpoints that page through append-heavy collections use keyset
//! pagination: the last key of a page is serialised into an opaque,
//! URL-safe cursor and handed back to the client. Clients never inspect the
//! cursor; they only echo it in the next request.
//!
//! ```
//! use pagination::{Cursor, PageParams, Paginated};
//!
//! let cursor = Cursor::new(42_i64).encode().expect("cursor encodes");
//! let params = PageParams::new(Some(cursor.clone()), Some(10));
//! let decoded: Cursor<i64> = params.cursor().expect("cursor decodes").expect("cursor present");
//! assert_eq!(*decoded.key(), 42);
//!
//! let page = Paginated::new(vec!["a", "b"], params.limit(), Some(cursor));
//! assert_eq!(page.data.len(), 2);
//! ```

mod cursor;
mod page;

pub use cursor::{Cursor, CursorError};
pub use page::{DEFAULT_LIMIT, MAX_LIMIT, PageParams, Paginated, PaginationLinks, split_page};
