//! Podcast feed generation.
//!
//! - [`assemble`] nests a podcast's seasons and episodes and rejects
//!   inconsistent catalogs
//! - [`rss`] serializes the assembled tree as iTunes RSS
//! - [`publish`] loads a podcast from the catalog and atomically replaces
//!   its feed file

mod assemble;
mod publish;
mod rss;

pub use assemble::{assemble, AssemblyError, FeedDocument, SeasonNode};
pub use publish::{FeedPublisher, FeedSnapshot, PublishError};
pub use rss::{
    display_title, render, FeedSettings, CATEGORY, ENCLOSURE_MIME, EPISODE_TYPE, EXPLICIT,
    SUBCATEGORY,
};
