//! Collector Module
//!
//! Turns a user's graph data into labeled training examples.
//!
//! ## Pipeline
//!
//! 1. **Snapshot** - Fetch profile, friends, wall and likes into an immutable snapshot
//! 2. **Wall Filter** - Select posts by time range, author, liker and commenter
//! 3. **Features** - Derive one labeled feature record per sampled post
//! 4. **Dataset** - Sample posts, resolve author snapshots, extract in parallel
//!
//! ## Features per post
//!
//! - Label: the owner wrote, liked or commented on the post
//! - Post length in words
//! - Recency gap since the two parties' first interactions before the post
//! - Interaction counts in each direction over a short window (3 days by default)
//! - Number of likes the owner and the author share

pub mod dataset;
pub mod features;
pub mod metrics;
pub mod model;
pub mod snapshot;
pub mod wall_filter;

pub use dataset::{SnapshotCache, TrainingSet, TrainingSetBuilder};
pub use features::{FeatureExtractor, FeatureRecord};
pub use model::{Comment, Friends, Identity, Post, UserSnapshot};
pub use snapshot::{FriendDepth, SnapshotBuilder};
pub use wall_filter::{Combinator, WallFilter};
