//! User Snapshot Builder
//!
//! Reads a user's profile, friends, feed and likes from the graph and turns
//! them into an immutable [`UserSnapshot`]. Timestamps are parsed here; one
//! malformed timestamp aborts the whole build, since everything downstream
//! compares posts by time.

use super::model::{Comment, Friends, Identity, Post, UserSnapshot};
use crate::config::ConnectionLimits;
use crate::error::{Error, Result};
use crate::graph_client::{GraphClient, Page};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Timestamp layout used by the Graph API, e.g. `2011-05-12T18:23:41+0000`
const GRAPH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// How far a build follows the friend list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendDepth {
    /// Do not fetch friends
    None,
    /// Friend identities only
    Shallow,
    /// A shallow snapshot per friend. Never goes deeper than one level.
    Recursive,
}

impl std::fmt::Display for FriendDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FriendDepth::None => write!(f, "none"),
            FriendDepth::Shallow => write!(f, "shallow"),
            FriendDepth::Recursive => write!(f, "recursive"),
        }
    }
}

impl FromStr for FriendDepth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(FriendDepth::None),
            "shallow" | "1" => Ok(FriendDepth::Shallow),
            "recursive" | "2" => Ok(FriendDepth::Recursive),
            other => Err(format!("unknown friend depth '{}'", other)),
        }
    }
}

// Raw feed entries. Only the fields below are kept; everything else is dropped.
#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    created_time: String,
    from: Identity,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    likes: Option<Page<Identity>>,
    #[serde(default)]
    comments: Option<Page<RawComment>>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    from: Identity,
    #[serde(default)]
    message: Option<String>,
    created_time: String,
}

#[derive(Debug, Deserialize)]
struct RawLike {
    id: String,
}

/// Parse a Graph API timestamp into an absolute UTC time.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(raw, GRAPH_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::malformed_timestamp(raw))
}

fn normalize_post(raw: RawPost, owner: &Identity) -> Result<Post> {
    let comments = raw
        .comments
        .map(|page| page.data)
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            Ok(Comment {
                from: c.from,
                message: c.message.unwrap_or_default(),
                created_time: parse_timestamp(&c.created_time)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Post {
        id: raw.id,
        created_time: parse_timestamp(&raw.created_time)?,
        from: raw.from,
        message: raw.message.unwrap_or_default(),
        likes: raw
            .likes
            .map(|page| page.data.into_iter().collect())
            .unwrap_or_default(),
        comments,
        to: owner.clone(),
    })
}

/// Builds snapshots over a [`GraphClient`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    client: GraphClient,
    limits: ConnectionLimits,
}

impl SnapshotBuilder {
    pub fn new(client: GraphClient, limits: ConnectionLimits) -> Self {
        Self { client, limits }
    }

    /// Build a snapshot of `user_id`. Friends are followed according to `depth`.
    #[instrument(skip(self))]
    pub async fn build(&self, user_id: &str, depth: FriendDepth) -> Result<UserSnapshot> {
        match depth {
            FriendDepth::Recursive => {
                let mut root = self.build_single(user_id, true).await?;
                let friend_ids: Vec<Identity> =
                    root.friends.identities().into_iter().cloned().collect();

                info!(
                    "Building {} friend snapshots for {}",
                    friend_ids.len(),
                    root.identity
                );
                let mut snapshots = Vec::with_capacity(friend_ids.len());
                for friend in &friend_ids {
                    snapshots.push(self.build_single(&friend.id, true).await?);
                }
                root.friends = Friends::Snapshots(snapshots);
                Ok(root)
            }
            FriendDepth::Shallow => self.build_single(user_id, true).await,
            FriendDepth::None => self.build_single(user_id, false).await,
        }
    }

    async fn build_single(&self, user_id: &str, with_friends: bool) -> Result<UserSnapshot> {
        let profile = self.client.fetch_object(user_id).await?;
        let identity: Identity = serde_json::from_value(profile)
            .map_err(|e| Error::invalid_response(format!("profile {}: {}", user_id, e)))?;

        let friends = if with_friends {
            Friends::Identities(
                self.client
                    .fetch_connection_data(
                        &identity.id,
                        "friends",
                        &[("limit", self.limits.friends.to_string())],
                    )
                    .await?,
            )
        } else {
            Friends::Empty
        };

        let raw_wall: Vec<RawPost> = self
            .client
            .fetch_connection_data(
                &identity.id,
                "feed",
                &[("limit", self.limits.feed.to_string())],
            )
            .await?;
        let wall = raw_wall
            .into_iter()
            .map(|raw| normalize_post(raw, &identity))
            .collect::<Result<Vec<_>>>()?;

        let likes: Vec<RawLike> = self
            .client
            .fetch_connection_data(
                &identity.id,
                "likes",
                &[("limit", self.limits.likes.to_string())],
            )
            .await?;

        debug!(
            "Snapshot of {}: {} friends, {} posts, {} likes",
            identity,
            friends.len(),
            wall.len(),
            likes.len()
        );

        Ok(UserSnapshot {
            identity,
            friends,
            wall,
            likes: likes.into_iter().map(|l| l.id).collect(),
            fetched_at: Utc::now(),
        })
    }
}
