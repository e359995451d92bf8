//! Recipient Resolution
//!
//! Paginated, cached user lookups for tenants and groups.

mod pagination;
mod recipients;

pub use pagination::assemble_pages;
pub use recipients::RecipientProvider;
