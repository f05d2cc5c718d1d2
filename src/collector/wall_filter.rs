//! Wall Filter
//!
//! Selects posts from a wall by time range, author, liker and commenter.
//!
//! The time bounds are exclusive and always restrict the result. The identity
//! predicates that are enabled are combined with [`Combinator::Intersection`]
//! or [`Combinator::Union`]; when none is enabled every post inside the time
//! bounds is kept, whichever combinator is chosen.

use super::model::{Identity, Post, UserSnapshot};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combinator {
    #[default]
    Intersection,
    Union,
}

/// Predicate configuration. Every option is disabled by default.
#[derive(Debug, Clone, Default)]
pub struct WallFilter {
    /// Exclusive lower bound
    pub time_start: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub time_end: Option<DateTime<Utc>>,
    pub author: Option<Identity>,
    pub liked_by: Option<Identity>,
    pub commented_by: Option<Identity>,
    pub combinator: Combinator,
}

enum Predicate<'a> {
    Author(&'a Identity),
    LikedBy(&'a Identity),
    CommentedBy(&'a Identity),
}

impl Predicate<'_> {
    fn matches(&self, post: &Post) -> bool {
        match self {
            Predicate::Author(who) => post.is_authored_by(who),
            Predicate::LikedBy(who) => post.is_liked_by(who),
            Predicate::CommentedBy(who) => post.is_commented_by(who),
        }
    }
}

impl WallFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(mut self, t: DateTime<Utc>) -> Self {
        self.time_start = Some(t);
        self
    }

    pub fn before(mut self, t: DateTime<Utc>) -> Self {
        self.time_end = Some(t);
        self
    }

    pub fn between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.after(start).before(end)
    }

    pub fn authored_by(mut self, who: &Identity) -> Self {
        self.author = Some(who.clone());
        self
    }

    pub fn liked_by(mut self, who: &Identity) -> Self {
        self.liked_by = Some(who.clone());
        self
    }

    pub fn commented_by(mut self, who: &Identity) -> Self {
        self.commented_by = Some(who.clone());
        self
    }

    pub fn combine(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    fn within_bounds(&self, post: &Post) -> bool {
        self.time_start.map_or(true, |start| post.created_time > start)
            && self.time_end.map_or(true, |end| post.created_time < end)
    }

    /// Apply the filter to a wall. Each post appears at most once in the result.
    pub fn apply<'w>(&self, wall: &'w [Post]) -> Vec<&'w Post> {
        // Resolve the enabled predicates once
        let active: Vec<Predicate<'_>> = [
            self.author.as_ref().map(Predicate::Author),
            self.liked_by.as_ref().map(Predicate::LikedBy),
            self.commented_by.as_ref().map(Predicate::CommentedBy),
        ]
        .into_iter()
        .flatten()
        .collect();

        wall.iter()
            .filter(|post| self.within_bounds(post))
            .filter(|post| match self.combinator {
                _ if active.is_empty() => true,
                Combinator::Intersection => active.iter().all(|p| p.matches(post)),
                Combinator::Union => active.iter().any(|p| p.matches(post)),
            })
            .collect()
    }
}

/// Filter a snapshot's wall
pub fn filter<'s>(snapshot: &'s UserSnapshot, predicates: &WallFilter) -> Vec<&'s Post> {
    predicates.apply(&snapshot.wall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::model::Comment;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 5, 12, hour, 0, 0).unwrap()
    }

    fn who(id: &str) -> Identity {
        Identity::new(id, id)
    }

    fn post(id: &str, hour: u32, from: &str, likers: &[&str], commenters: &[&str]) -> Post {
        Post {
            id: id.to_string(),
            created_time: at(hour),
            from: who(from),
            message: String::new(),
            likes: likers.iter().map(|l| who(l)).collect(),
            comments: commenters
                .iter()
                .map(|c| Comment {
                    from: who(c),
                    message: "ok".into(),
                    created_time: at(hour),
                })
                .collect(),
            to: who("owner"),
        }
    }

    fn wall() -> Vec<Post> {
        vec![
            post("p1", 1, "owner", &["alice"], &[]),
            post("p2", 2, "alice", &[], &["bob"]),
            post("p3", 3, "bob", &["alice", "bob"], &["alice"]),
            post("p4", 4, "owner", &[], &[]),
        ]
    }

    fn ids(posts: &[&Post]) -> HashSet<String> {
        posts.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_no_predicates_returns_full_wall_for_both_combinators() {
        let wall = wall();
        let all: HashSet<String> = wall.iter().map(|p| p.id.clone()).collect();

        let intersection = WallFilter::new().apply(&wall);
        assert_eq!(ids(&intersection), all);

        let union = WallFilter::new().combine(Combinator::Union).apply(&wall);
        assert_eq!(ids(&union), all);
    }

    #[test]
    fn test_time_bounds_are_exclusive() {
        let wall = vec![
            post("t1", 1, "owner", &[], &[]),
            post("t2", 2, "owner", &[], &[]),
            post("t3", 3, "owner", &[], &[]),
        ];
        let result = WallFilter::new().between(at(1), at(3)).apply(&wall);
        assert_eq!(ids(&result), HashSet::from(["t2".to_string()]));

        let after_first = WallFilter::new().after(at(1)).apply(&wall);
        assert_eq!(after_first.len(), 2);
    }

    #[test]
    fn test_single_predicates() {
        let wall = wall();
        assert_eq!(
            ids(&WallFilter::new().authored_by(&who("owner")).apply(&wall)),
            HashSet::from(["p1".to_string(), "p4".to_string()])
        );
        assert_eq!(
            ids(&WallFilter::new().liked_by(&who("alice")).apply(&wall)),
            HashSet::from(["p1".to_string(), "p3".to_string()])
        );
        assert_eq!(
            ids(&WallFilter::new().commented_by(&who("bob")).apply(&wall)),
            HashSet::from(["p2".to_string()])
        );
    }

    #[test]
    fn test_intersection_and_union() {
        let wall = wall();
        let alice = who("alice");

        let both = WallFilter::new()
            .liked_by(&alice)
            .commented_by(&alice)
            .apply(&wall);
        assert_eq!(ids(&both), HashSet::from(["p3".to_string()]));

        let either = WallFilter::new()
            .authored_by(&alice)
            .commented_by(&alice)
            .combine(Combinator::Union)
            .apply(&wall);
        assert_eq!(ids(&either), HashSet::from(["p2".to_string(), "p3".to_string()]));
    }

    #[test]
    fn test_union_still_respects_time_bounds() {
        let wall = wall();
        let result = WallFilter::new()
            .authored_by(&who("owner"))
            .liked_by(&who("alice"))
            .combine(Combinator::Union)
            .before(at(4))
            .apply(&wall);
        assert_eq!(ids(&result), HashSet::from(["p1".to_string(), "p3".to_string()]));
    }

    #[test]
    fn test_identity_match_ignores_name() {
        let wall = wall();
        let renamed = Identity::new("alice", "Alice Smith");
        assert_eq!(WallFilter::new().authored_by(&renamed).apply(&wall).len(), 1);
    }
}
