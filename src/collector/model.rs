//! Snapshot data model
//!
//! Identities, posts and user snapshots. All of these are created while a
//! snapshot is built and are read-only afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

/// A user of the graph. Equality and hashing use `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub from: Identity,
    pub message: String,
    pub created_time: DateTime<Utc>,
}

/// A wall post. `to` is the owner of the wall it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub from: Identity,
    pub message: String,
    pub likes: HashSet<Identity>,
    pub comments: Vec<Comment>,
    pub to: Identity,
}

impl Post {
    pub fn is_authored_by(&self, who: &Identity) -> bool {
        self.from == *who
    }

    pub fn is_liked_by(&self, who: &Identity) -> bool {
        self.likes.contains(who)
    }

    pub fn is_commented_by(&self, who: &Identity) -> bool {
        self.comments.iter().any(|c| c.from == *who)
    }

    /// Whitespace-delimited token count of the message
    pub fn word_count(&self) -> usize {
        self.message.split_whitespace().count()
    }
}

/// Friend list of a snapshot, depending on how far the build followed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum Friends {
    /// Friends were not fetched
    Empty,
    /// Friend identities only
    Identities(Vec<Identity>),
    /// One fully built snapshot per friend
    Snapshots(Vec<UserSnapshot>),
}

impl Friends {
    pub fn len(&self) -> usize {
        match self {
            Friends::Empty => 0,
            Friends::Identities(ids) => ids.len(),
            Friends::Snapshots(snapshots) => snapshots.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn identities(&self) -> Vec<&Identity> {
        match self {
            Friends::Empty => Vec::new(),
            Friends::Identities(ids) => ids.iter().collect(),
            Friends::Snapshots(snapshots) => snapshots.iter().map(|s| &s.identity).collect(),
        }
    }

    pub fn snapshots(&self) -> &[UserSnapshot] {
        match self {
            Friends::Snapshots(snapshots) => snapshots,
            _ => &[],
        }
    }
}

/// Point-in-time capture of a user's profile, friends, wall and likes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSnapshot {
    pub identity: Identity,
    pub friends: Friends,
    pub wall: Vec<Post>,
    /// Ids of the pages/objects the user likes
    pub likes: BTreeSet<String>,
    pub fetched_at: DateTime<Utc>,
}

impl UserSnapshot {
    /// Number of like ids this user shares with `other`. Symmetric.
    pub fn common_likes(&self, other: &UserSnapshot) -> usize {
        self.likes.intersection(&other.likes).count()
    }

    pub fn friend_snapshot(&self, id: &str) -> Option<&UserSnapshot> {
        self.friends
            .snapshots()
            .iter()
            .find(|s| s.identity.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, likes: &[&str]) -> UserSnapshot {
        UserSnapshot {
            identity: Identity::new(id, id),
            friends: Friends::Empty,
            wall: Vec::new(),
            likes: likes.iter().map(|s| s.to_string()).collect(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_identity_equality_is_by_id() {
        assert_eq!(Identity::new("1", "Alice"), Identity::new("1", "Alice B."));
        assert_ne!(Identity::new("1", "Alice"), Identity::new("2", "Alice"));

        let set: HashSet<Identity> = [Identity::new("1", "a"), Identity::new("1", "b")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_common_likes_symmetric() {
        let a = snapshot("a", &["1", "2", "3"]);
        let b = snapshot("b", &["2", "3", "4"]);
        assert_eq!(a.common_likes(&b), 2);
        assert_eq!(b.common_likes(&a), 2);
        assert_eq!(a.common_likes(&snapshot("c", &[])), 0);
    }

    #[test]
    fn test_word_count() {
        let post = Post {
            id: "1_1".into(),
            created_time: Utc::now(),
            from: Identity::new("1", "a"),
            message: "  hello   there\nworld\t".into(),
            likes: HashSet::new(),
            comments: Vec::new(),
            to: Identity::new("1", "a"),
        };
        assert_eq!(post.word_count(), 3);
    }

    #[test]
    fn test_friends_accessors() {
        let friends = Friends::Snapshots(vec![snapshot("f1", &[]), snapshot("f2", &[])]);
        assert_eq!(friends.len(), 2);
        assert_eq!(friends.identities()[1].id, "f2");
        assert!(Friends::Empty.is_empty());
        assert!(Friends::Identities(vec![Identity::new("x", "")]).snapshots().is_empty());
    }
}
