use std::collections::HashMap;

use thiserror::Error;

use crate::storage::{Episode, Owner, Podcast, Season};

/// Referential or ordinal violations found while nesting a podcast's
/// entities. Any of them aborts the feed for this cycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("podcast {podcast_id} references owner {podcast_owner}, but owner {owner} was given")]
    OwnerMismatch {
        podcast_id: i64,
        podcast_owner: i64,
        owner: i64,
    },

    #[error("season {season_id} references podcast {season_podcast}, expected {podcast_id}")]
    SeasonPodcastMismatch {
        season_id: i64,
        season_podcast: i64,
        podcast_id: i64,
    },

    #[error("duplicate season number {num} in podcast {podcast_id}")]
    DuplicateSeasonOrdinal { podcast_id: i64, num: i64 },

    #[error("episode {episode_id} references season {season_id}, which is not part of the podcast")]
    OrphanEpisode { episode_id: i64, season_id: i64 },

    #[error("duplicate episode number {num} in season {season_id}")]
    DuplicateEpisodeOrdinal { season_id: i64, num: i64 },
}

/// A validated podcast ready for serialization.
///
/// Seasons are in ordinal order and so are the episodes inside each season;
/// that nesting order is the published item order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub owner: Owner,
    pub podcast: Podcast,
    pub seasons: Vec<SeasonNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonNode {
    pub season: Season,
    pub episodes: Vec<Episode>,
}

impl FeedDocument {
    /// Episodes paired with their season, in publish order.
    pub fn items(&self) -> impl Iterator<Item = (&Season, &Episode)> {
        self.seasons
            .iter()
            .flat_map(|node| node.episodes.iter().map(move |e| (&node.season, e)))
    }
}

/// Builds the nested feed tree from flat entity lists.
///
/// Pure and side-effect free: nothing partial is returned on failure.
pub fn assemble(
    owner: Owner,
    podcast: Podcast,
    seasons: Vec<Season>,
    episodes: Vec<Episode>,
) -> Result<FeedDocument, AssemblyError> {
    if podcast.owner_id != owner.id {
        return Err(AssemblyError::OwnerMismatch {
            podcast_id: podcast.id,
            podcast_owner: podcast.owner_id,
            owner: owner.id,
        });
    }

    if let Some(season) = seasons.iter().find(|s| s.podcast_id != podcast.id) {
        return Err(AssemblyError::SeasonPodcastMismatch {
            season_id: season.id,
            season_podcast: season.podcast_id,
            podcast_id: podcast.id,
        });
    }

    let mut nodes: Vec<SeasonNode> = seasons
        .into_iter()
        .map(|season| SeasonNode {
            season,
            episodes: Vec::new(),
        })
        .collect();
    // Vec::sort_by_key is stable
    nodes.sort_by_key(|node| node.season.num);
    if let Some(num) = first_duplicate(nodes.iter().map(|n| n.season.num)) {
        return Err(AssemblyError::DuplicateSeasonOrdinal {
            podcast_id: podcast.id,
            num,
        });
    }

    let index: HashMap<i64, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.season.id, i))
        .collect();
    for episode in episodes {
        let Some(&slot) = index.get(&episode.season_id) else {
            return Err(AssemblyError::OrphanEpisode {
                episode_id: episode.id,
                season_id: episode.season_id,
            });
        };
        nodes[slot].episodes.push(episode);
    }

    for node in &mut nodes {
        node.episodes.sort_by_key(|e| e.num);
        if let Some(num) = first_duplicate(node.episodes.iter().map(|e| e.num)) {
            return Err(AssemblyError::DuplicateEpisodeOrdinal {
                season_id: node.season.id,
                num,
            });
        }
    }

    Ok(FeedDocument {
        owner,
        podcast,
        seasons: nodes,
    })
}

/// First value equal to its predecessor in an already sorted sequence.
fn first_duplicate(sorted: impl Iterator<Item = i64>) -> Option<i64> {
    let mut previous = None;
    for value in sorted {
        if previous == Some(value) {
            return Some(value);
        }
        previous = Some(value);
    }
    None
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_nests_and_orders_seasons_and_episodes() {
        let doc = assemble(
            owner(1),
            podcast(10, 1),
            vec![season(101, 10, 2), season(100, 10, 1)],
            vec![
                episode(3, 101, 1),
                episode(2, 100, 2),
                episode(1, 100, 1),
            ],
        )
        .unwrap();

        let order: Vec<(i64, i64)> = doc.items().map(|(s, e)| (s.num, e.num)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn test_season_without_episodes_kept() {
        let doc = assemble(owner(1), podcast(10, 1), vec![season(100, 10, 1)], vec![]).unwrap();
        assert_eq!(doc.seasons.len(), 1);
        assert!(doc.seasons[0].episodes.is_empty());
        assert_eq!(doc.items().count(), 0);
    }

    #[test]
    fn test_owner_mismatch_rejected() {
        let err = assemble(owner(2), podcast(10, 1), vec![], vec![]).unwrap_err();
        assert_eq!(
            err,
            AssemblyError::OwnerMismatch {
                podcast_id: 10,
                podcast_owner: 1,
                owner: 2
            }
        );
    }

    #[test]
    fn test_foreign_season_rejected() {
        let err = assemble(
            owner(1),
            podcast(10, 1),
            vec![season(100, 10, 1), season(200, 20, 2)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::SeasonPodcastMismatch { season_id: 200, .. }
        ));
    }

    #[test]
    fn test_duplicate_season_ordinal_rejected() {
        let err = assemble(
            owner(1),
            podcast(10, 1),
            vec![season(100, 10, 1), season(101, 10, 1)],
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::DuplicateSeasonOrdinal {
                podcast_id: 10,
                num: 1
            }
        );
        assert!(err.to_string().contains("duplicate season number 1"));
    }

    #[test]
    fn test_orphan_episode_rejected() {
        let err = assemble(
            owner(1),
            podcast(10, 1),
            vec![season(100, 10, 1)],
            vec![episode(5, 999, 1)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::OrphanEpisode {
                episode_id: 5,
                season_id: 999
            }
        );
    }

    #[test]
    fn test_duplicate_episode_ordinal_rejected() {
        let err = assemble(
            owner(1),
            podcast(10, 1),
            vec![season(100, 10, 1)],
            vec![episode(1, 100, 4), episode(2, 100, 4)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::DuplicateEpisodeOrdinal {
                season_id: 100,
                num: 4
            }
        );
    }

    #[test]
    fn test_same_episode_ordinal_in_different_seasons_allowed() {
        let doc = assemble(
            owner(1),
            podcast(10, 1),
            vec![season(100, 10, 1), season(101, 10, 2)],
            vec![episode(1, 100, 1), episode(2, 101, 1)],
        )
        .unwrap();
        assert_eq!(doc.items().count(), 2);
    }

    proptest! {
        #[test]
        fn prop_items_follow_ordinals(
            season_nums in proptest::sample::subsequence((1i64..40).collect::<Vec<_>>(), 1..6)
                .prop_shuffle(),
            episode_counts in proptest::collection::vec(0usize..6, 6),
        ) {
            let seasons: Vec<Season> = season_nums
                .iter()
                .enumerate()
                .map(|(i, &num)| season(100 + i as i64, 10, num))
                .collect();
            let mut episodes = Vec::new();
            let mut next_id = 1;
            for (i, s) in seasons.iter().enumerate() {
                // Insert in descending ordinal order to force sorting
                for num in (1..=episode_counts[i] as i64).rev() {
                    episodes.push(episode(next_id, s.id, num));
                    next_id += 1;
                }
            }
            let total = episodes.len();

            let doc = assemble(owner(1), podcast(10, 1), seasons, episodes).unwrap();

            let order: Vec<(i64, i64)> = doc.items().map(|(s, e)| (s.num, e.num)).collect();
            let mut sorted = order.clone();
            sorted.sort();
            prop_assert_eq!(order.len(), total);
            prop_assert_eq!(order, sorted);
        }

        #[test]
        fn prop_duplicate_season_ordinal_always_rejected(
            nums in proptest::collection::vec(1i64..5, 2..8),
        ) {
            let seasons: Vec<Season> = nums
                .iter()
                .enumerate()
                .map(|(i, &num)| season(100 + i as i64, 10, num))
                .collect();
            let mut unique = nums.clone();
            unique.sort();
            unique.dedup();

            let result = assemble(owner(1), podcast(10, 1), seasons, vec![]);
            if unique.len() == nums.len() {
                prop_assert!(result.is_ok());
            } else {
                let is_duplicate = matches!(result, Err(AssemblyError::DuplicateSeasonOrdinal { .. }));
                prop_assert!(is_duplicate);
            }
        }
    }
}
