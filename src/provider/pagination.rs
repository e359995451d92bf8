//! Pagination Assembly
//!
//! Walks a paginated directory listing from offset 0 and assembles the full
//! ordered result. A page holding strictly fewer entries than requested
//! (possibly none) is the only termination signal, so a listing whose size
//! is an exact multiple of the page size ends with one empty page request.

use hashbrown::HashSet;
use std::future::Future;
use std::num::NonZeroUsize;
use tracing::debug;

use crate::directory::{Page, User};
use crate::error::Result;

/// Fetch pages strictly in increasing offset order until a short page.
///
/// `fetch_page` receives `(offset, limit)`; `limit` is always `page_size`.
/// Usernames already seen are skipped, keeping the first occurrence. Any
/// error aborts the walk and the users accumulated so far are dropped.
pub async fn assemble_pages<F, Fut>(page_size: NonZeroUsize, mut fetch_page: F) -> Result<Vec<User>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Page<User>>>,
{
    let limit = page_size.get();
    let mut users = Vec::new();
    let mut seen = HashSet::new();
    let mut offset = 0;
    let mut pages = 0;

    loop {
        let page = fetch_page(offset, limit).await?;
        pages += 1;
        let received = page.data.len();

        for user in page.data {
            if seen.insert(user.username.clone()) {
                users.push(user);
            } else {
                debug!(username = %user.username, offset = offset, "Skipping duplicate user");
            }
        }

        if received < limit {
            break;
        }
        offset += limit;
    }

    debug!(pages = pages, users = users.len(), "Pagination assembled");
    Ok(users)
}
