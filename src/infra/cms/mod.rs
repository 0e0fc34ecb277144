//! Headless CMS REST adapter.

mod client;
mod error;
mod query;

pub use client::CmsClient;
pub use error::CmsError;
pub use query::QueryParams;
