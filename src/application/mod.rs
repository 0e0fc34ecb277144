//! Application services: the cached content facade and its upstream seam.

pub mod content;
pub mod error;
pub mod source;
