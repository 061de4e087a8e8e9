//! castdrop: a podcast catalog that imports dropped-in episodes and
//! publishes iTunes RSS feeds for them.

pub mod config;
pub mod feed;
pub mod import;
pub mod layout;
pub mod seed;
pub mod storage;
pub mod util;
