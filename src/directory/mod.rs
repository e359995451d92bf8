//! Directory Access
//!
//! Users and groups sourced from the external RBAC directory.

mod client;
mod memory;
mod model;
mod rbac;

pub use client::{DirectoryClient, GroupResolver};
pub use memory::{numbered_users, InMemoryDirectory, PageRequest};
pub use model::{Group, Meta, Page, User};
pub use rbac::RbacClient;
