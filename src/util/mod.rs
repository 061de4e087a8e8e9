//! Utility functions shared by the import pipeline and the feed publisher.
//!
//! - **Filesystem**: atomic replace-by-rename and cross-device-safe moves
//! - **URLs**: static content base validation and location joining

pub mod fs;
mod static_url;

pub use static_url::{join_url, validate_base_url, BaseUrlError};
