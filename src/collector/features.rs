//! Interaction Feature Extraction
//!
//! Derives one labeled training example per post from the snapshots of the
//! wall owner and the post's author. Every statistic is computed with
//! [`WallFilter`] queries over the two walls.

use super::model::{Post, UserSnapshot};
use super::wall_filter::{Combinator, WallFilter};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-shape feature tuple for one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// The owner wrote, liked, or commented on the post
    pub label: bool,
    /// Whitespace-delimited word count of the message
    pub post_length: usize,
    /// Time since the later of the two parties' first interaction before the post.
    /// Zero for the owner's own posts; `None` when either side has no prior interaction.
    #[serde(with = "duration_secs")]
    pub recency_gap: Option<Duration>,
    /// Author's posts inside the window that the owner liked or commented on
    pub owner_to_author_interactions: usize,
    /// Owner's posts inside the window that the author liked or commented on
    pub author_to_owner_interactions: usize,
    pub common_like_count: usize,
}

/// Stateless extractor. Snapshots are only read.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    interaction_window: Duration,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(Duration::days(3))
    }
}

impl FeatureExtractor {
    pub fn new(interaction_window: Duration) -> Self {
        Self { interaction_window }
    }

    /// Extract the features of `post` on `owner`'s wall.
    ///
    /// `author` must be the snapshot of `post.from`; for the owner's own
    /// posts pass the owner snapshot again.
    pub fn extract(&self, owner: &UserSnapshot, author: &UserSnapshot, post: &Post) -> FeatureRecord {
        let me = &owner.identity;
        let self_authored = post.from == *me;

        let label = self_authored || post.is_liked_by(me) || post.is_commented_by(me);

        let recency_gap = if self_authored {
            Some(Duration::zero())
        } else {
            self.recency_gap(owner, author, post)
        };

        let window_start = post
            .created_time
            .checked_sub_signed(self.interaction_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let window = WallFilter::new().between(window_start, post.created_time);

        let owner_to_author_interactions = window.clone().liked_by(me).apply(&author.wall).len()
            + window.clone().commented_by(me).apply(&author.wall).len();

        let them = &author.identity;
        let author_to_owner_interactions = window.clone().liked_by(them).apply(&owner.wall).len()
            + window.commented_by(them).apply(&owner.wall).len();

        FeatureRecord {
            label,
            post_length: post.word_count(),
            recency_gap,
            owner_to_author_interactions,
            author_to_owner_interactions,
            common_like_count: owner.common_likes(author),
        }
    }

    /// Gap between the post and the later of the two earliest prior interactions,
    /// one looked up on each wall. `None` when either wall has none.
    fn recency_gap(&self, owner: &UserSnapshot, author: &UserSnapshot, post: &Post) -> Option<Duration> {
        let earliest = |wall_of: &UserSnapshot, other: &UserSnapshot| {
            WallFilter::new()
                .authored_by(&other.identity)
                .commented_by(&other.identity)
                .combine(Combinator::Union)
                .before(post.created_time)
                .apply(&wall_of.wall)
                .into_iter()
                .map(|p| p.created_time)
                .min()
        };

        let owner_side = earliest(owner, author)?;
        let author_side = earliest(author, owner)?;
        Some(post.created_time - owner_side.max(author_side))
    }
}

/// Serializes `Option<Duration>` as whole seconds, `null` for `None`
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.num_seconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(Duration::seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::model::{Comment, Friends, Identity};
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 5, day, hour, 0, 0).unwrap()
    }

    fn who(id: &str) -> Identity {
        Identity::new(id, id)
    }

    struct PostFixture<'a> {
        id: &'a str,
        time: DateTime<Utc>,
        from: &'a str,
        to: &'a str,
        message: &'a str,
        likers: &'a [&'a str],
        commenters: &'a [&'a str],
    }

    fn post(fixture: PostFixture<'_>) -> Post {
        Post {
            id: fixture.id.to_string(),
            created_time: fixture.time,
            from: who(fixture.from),
            message: fixture.message.to_string(),
            likes: fixture.likers.iter().map(|l| who(l)).collect::<HashSet<_>>(),
            comments: fixture
                .commenters
                .iter()
                .map(|c| Comment {
                    from: who(c),
                    message: "+1".into(),
                    created_time: fixture.time,
                })
                .collect(),
            to: who(fixture.to),
        }
    }

    fn simple(id: &str, time: DateTime<Utc>, from: &str, to: &str) -> Post {
        post(PostFixture {
            id,
            time,
            from,
            to,
            message: "",
            likers: &[],
            commenters: &[],
        })
    }

    fn snapshot(id: &str, wall: Vec<Post>, likes: &[&str]) -> UserSnapshot {
        UserSnapshot {
            identity: who(id),
            friends: Friends::Empty,
            wall,
            likes: likes.iter().map(|s| s.to_string()).collect(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_own_post_has_zero_gap_and_positive_label() {
        let own = simple("o_1", at(10, 12), "owner", "owner");
        let owner = snapshot("owner", vec![own.clone()], &[]);

        let record = FeatureExtractor::default().extract(&owner, &owner, &own);
        assert!(record.label);
        assert_eq!(record.recency_gap, Some(Duration::zero()));
    }

    #[test]
    fn test_owner_comment_alone_makes_label_true() {
        let p = post(PostFixture {
            id: "o_2",
            time: at(10, 12),
            from: "friend",
            to: "owner",
            message: "look at this",
            likers: &[],
            commenters: &["owner"],
        });
        let owner = snapshot("owner", vec![p.clone()], &[]);
        let friend = snapshot("friend", vec![], &[]);

        let record = FeatureExtractor::default().extract(&owner, &friend, &p);
        assert!(record.label);
        assert_eq!(record.post_length, 3);
    }

    #[test]
    fn test_unrelated_post_label_false() {
        let p = post(PostFixture {
            id: "o_3",
            time: at(10, 12),
            from: "friend",
            to: "owner",
            message: "hello",
            likers: &["stranger"],
            commenters: &["stranger"],
        });
        let owner = snapshot("owner", vec![p.clone()], &[]);
        let friend = snapshot("friend", vec![], &[]);

        assert!(!FeatureExtractor::default().extract(&owner, &friend, &p).label);
    }

    #[test]
    fn test_recency_gap_uses_later_of_earliest_interactions() {
        let target = simple("o_9", at(20, 12), "friend", "owner");
        // Friend first wrote on owner's wall on day 5; owner first wrote on friend's wall on day 8.
        let owner = snapshot(
            "owner",
            vec![
                simple("o_1", at(5, 12), "friend", "owner"),
                simple("o_2", at(15, 12), "friend", "owner"),
                target.clone(),
            ],
            &[],
        );
        let friend = snapshot(
            "friend",
            vec![
                simple("f_1", at(8, 12), "owner", "friend"),
                // After the target post: must be ignored
                simple("f_2", at(25, 12), "owner", "friend"),
            ],
            &[],
        );

        let record = FeatureExtractor::default().extract(&owner, &friend, &target);
        assert_eq!(record.recency_gap, Some(at(20, 12) - at(8, 12)));
    }

    #[test]
    fn test_recency_gap_counts_comments_as_interaction() {
        let target = simple("o_9", at(20, 12), "friend", "owner");
        let owner = snapshot(
            "owner",
            vec![
                post(PostFixture {
                    id: "o_1",
                    time: at(2, 0),
                    from: "owner",
                    to: "owner",
                    message: "",
                    likers: &[],
                    commenters: &["friend"],
                }),
                target.clone(),
            ],
            &[],
        );
        let friend = snapshot("friend", vec![simple("f_1", at(1, 0), "owner", "friend")], &[]);

        let record = FeatureExtractor::default().extract(&owner, &friend, &target);
        assert_eq!(record.recency_gap, Some(at(20, 12) - at(2, 0)));
    }

    #[test]
    fn test_recency_gap_none_without_prior_interaction() {
        let target = simple("o_9", at(20, 12), "friend", "owner");
        let owner = snapshot("owner", vec![target.clone()], &[]);
        let friend = snapshot("friend", vec![simple("f_1", at(1, 0), "friend", "friend")], &[]);

        let record = FeatureExtractor::default().extract(&owner, &friend, &target);
        assert_eq!(record.recency_gap, None);
    }

    #[test]
    fn test_interaction_counts_use_window() {
        let target = simple("o_9", at(20, 12), "friend", "owner");
        let owner = snapshot(
            "owner",
            vec![
                // liked and commented by friend inside the window: counts twice
                post(PostFixture {
                    id: "o_1",
                    time: at(19, 12),
                    from: "owner",
                    to: "owner",
                    message: "",
                    likers: &["friend"],
                    commenters: &["friend"],
                }),
                // outside the 3-day window
                post(PostFixture {
                    id: "o_2",
                    time: at(10, 12),
                    from: "owner",
                    to: "owner",
                    message: "",
                    likers: &["friend"],
                    commenters: &[],
                }),
                target.clone(),
            ],
            &["1", "2", "3"],
        );
        let friend = snapshot(
            "friend",
            vec![
                post(PostFixture {
                    id: "f_1",
                    time: at(18, 12),
                    from: "friend",
                    to: "friend",
                    message: "",
                    likers: &["owner"],
                    commenters: &[],
                }),
                // exactly at the window start: excluded
                post(PostFixture {
                    id: "f_2",
                    time: at(17, 12),
                    from: "friend",
                    to: "friend",
                    message: "",
                    likers: &["owner"],
                    commenters: &["owner"],
                }),
            ],
            &["2", "3", "4"],
        );

        let record = FeatureExtractor::default().extract(&owner, &friend, &target);
        assert_eq!(record.owner_to_author_interactions, 1);
        assert_eq!(record.author_to_owner_interactions, 2);
        assert_eq!(record.common_like_count, 2);
    }

    #[test]
    fn test_oversized_window_covers_whole_history() {
        let target = simple("o_9", at(20, 12), "friend", "owner");
        let old = post(PostFixture {
            id: "o_1",
            time: Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap(),
            from: "owner",
            to: "owner",
            message: "",
            likers: &["friend"],
            commenters: &[],
        });
        let owner = snapshot("owner", vec![old, target.clone()], &[]);
        let friend = snapshot("friend", Vec::new(), &[]);

        let record = FeatureExtractor::new(Duration::max_value()).extract(&owner, &friend, &target);
        assert_eq!(record.author_to_owner_interactions, 1);
    }

    #[test]
    fn test_record_serializes_gap_as_seconds() {
        let record = FeatureRecord {
            label: true,
            post_length: 4,
            recency_gap: Some(Duration::hours(1)),
            owner_to_author_interactions: 0,
            author_to_owner_interactions: 1,
            common_like_count: 2,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["recency_gap"], 3600);

        let none = FeatureRecord {
            recency_gap: None,
            ..record
        };
        assert!(serde_json::to_value(&none).unwrap()["recency_gap"].is_null());
    }
}
