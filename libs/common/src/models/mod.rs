//! Persisted models shared by every service

pub mod page;
pub mod user;

// Re-export for convenience
pub use page::{NewPage, Page, PageChanges, PageField, PageStatus, PublishedPage};
pub use user::{NewUser, UpdateValue, UserChanges, User, UserField};
