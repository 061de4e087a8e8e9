mod catalog;
mod episodes;
mod podcasts;
mod schema;
mod seasons;
mod types;

pub use catalog::CatalogStore;
pub use schema::Database;
pub use types::{
    DatabaseError, Episode, NewEpisode, NewOwner, NewPodcast, NewSeason, Owner, Podcast, Season,
};
