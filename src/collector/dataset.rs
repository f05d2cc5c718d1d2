//! Training set assembly
//!
//! Drives one collection run for an owner snapshot:
//! 1. Sample posts from the owner's wall
//! 2. Resolve each distinct author's snapshot through a shared cache
//! 3. Extract one feature record per sampled post in parallel

use super::features::{FeatureExtractor, FeatureRecord};
use super::metrics::{CollectionMetrics, PerformanceTimer};
use super::model::{Identity, Post, UserSnapshot};
use super::snapshot::{FriendDepth, SnapshotBuilder};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, Semaphore};
use tracing::{debug, info, instrument, warn};

/// Labeled examples collected for one owner
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSet {
    pub owner: Identity,
    pub collected_at: DateTime<Utc>,
    pub records: Vec<FeatureRecord>,
}

/// Per-run snapshot cache keyed by user id.
///
/// Concurrent requests for the same user share one fetch.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<UserSnapshot>>>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already built snapshot
    pub async fn seed(&self, snapshot: Arc<UserSnapshot>) {
        let id = snapshot.identity.id.clone();
        let cell = Arc::new(OnceCell::new_with(Some(snapshot)));
        self.entries.lock().await.insert(id, cell);
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<UserSnapshot>> {
        let entries = self.entries.lock().await;
        entries.get(user_id).and_then(|cell| cell.get().cloned())
    }

    /// Return the cached snapshot of `user_id`, building it without friends on a miss.
    pub async fn get_or_fetch(
        &self,
        builder: &SnapshotBuilder,
        user_id: &str,
    ) -> Result<Arc<UserSnapshot>> {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_try_init(|| async {
            debug!("Fetching author snapshot {}", user_id);
            builder.build(user_id, FriendDepth::None).await.map(Arc::new)
        })
        .await
        .cloned()
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }
}

/// Pick up to `limit` posts. The whole wall is returned in order when it fits.
pub fn sample_posts<'w, R: Rng + ?Sized>(wall: &'w [Post], limit: usize, rng: &mut R) -> Vec<&'w Post> {
    if wall.len() <= limit {
        return wall.iter().collect();
    }
    wall.choose_multiple(rng, limit).collect()
}

/// Builds a [`TrainingSet`] from an owner snapshot
pub struct TrainingSetBuilder {
    builder: SnapshotBuilder,
    cache: Arc<SnapshotCache>,
    extractor: FeatureExtractor,
    sample_limit: usize,
    author_concurrency: usize,
}

impl TrainingSetBuilder {
    pub fn new(
        builder: SnapshotBuilder,
        extractor: FeatureExtractor,
        sample_limit: usize,
        author_concurrency: usize,
    ) -> Self {
        Self {
            builder,
            cache: Arc::new(SnapshotCache::new()),
            extractor,
            sample_limit,
            author_concurrency: author_concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    #[instrument(skip_all, fields(owner = %owner.identity.id))]
    pub async fn collect(&self, owner: Arc<UserSnapshot>) -> Result<(TrainingSet, CollectionMetrics)> {
        let run_timer = PerformanceTimer::new("collect_training_set");
        let mut metrics = CollectionMetrics::for_owner(&owner.identity.id);
        metrics.friends_collected = owner.friends.len();
        metrics.wall_posts = owner.wall.len();

        // Recursed friends are already built; reuse them as author snapshots
        self.cache.seed(owner.clone()).await;
        for friend in owner.friends.snapshots() {
            self.cache.seed(Arc::new(friend.clone())).await;
        }

        let sampled: Vec<Post> = {
            let mut rng = rand::thread_rng();
            sample_posts(&owner.wall, self.sample_limit, &mut rng)
                .into_iter()
                .cloned()
                .collect()
        };
        metrics.posts_sampled = sampled.len();
        info!(
            "📝 Sampled {}/{} posts from {}",
            sampled.len(),
            owner.wall.len(),
            owner.identity
        );

        let author_timer = PerformanceTimer::new("resolve_authors");
        let authors = self.resolve_authors(&sampled, &mut metrics).await?;
        metrics.author_fetch_ms = author_timer.elapsed_ms();

        let jobs: Vec<(Post, Arc<UserSnapshot>)> = sampled
            .into_iter()
            .filter_map(|post| match authors.get(&post.from.id) {
                Some(author) => Some((post, author.clone())),
                None => {
                    metrics.posts_skipped += 1;
                    None
                }
            })
            .collect();

        let extraction_timer = PerformanceTimer::new("extract_features");
        let extractor = self.extractor;
        let owner_ref = owner.clone();
        let records = tokio::task::spawn_blocking(move || {
            use rayon::prelude::*;

            jobs.par_iter()
                .map(|(post, author)| extractor.extract(&owner_ref, author, post))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::internal(format!("feature extraction task failed: {}", e)))?;
        metrics.extraction_ms = extraction_timer.elapsed_ms();

        metrics.records_produced = records.len();
        metrics.positive_labels = records.iter().filter(|r| r.label).count();
        metrics.total_duration_ms = run_timer.elapsed_ms();
        run_timer.log_if_slow(60_000);

        let set = TrainingSet {
            owner: owner.identity.clone(),
            collected_at: Utc::now(),
            records,
        };
        Ok((set, metrics))
    }

    /// Extract the features of a single post, fetching its author's snapshot
    /// through the cache when it is not already known.
    pub async fn extract_feature(&self, owner: &Arc<UserSnapshot>, post: &Post) -> Result<FeatureRecord> {
        let author = if post.from == owner.identity {
            owner.clone()
        } else {
            self.cache.get_or_fetch(&self.builder, &post.from.id).await?
        };
        Ok(self.extractor.extract(owner, &author, post))
    }

    /// Fetch every distinct author of `posts`, bounded by `author_concurrency`.
    /// Failed authors are logged and left out of the returned map.
    async fn resolve_authors(
        &self,
        posts: &[Post],
        metrics: &mut CollectionMetrics,
    ) -> Result<HashMap<String, Arc<UserSnapshot>>> {
        let distinct: HashSet<String> = posts.iter().map(|p| p.from.id.clone()).collect();

        let mut resolved = HashMap::with_capacity(distinct.len());
        let mut missing = Vec::new();
        for id in distinct {
            match self.cache.get(&id).await {
                Some(snapshot) => {
                    resolved.insert(id, snapshot);
                }
                None => missing.push(id),
            }
        }

        if missing.is_empty() {
            return Ok(resolved);
        }
        info!("🔍 Fetching {} author snapshots", missing.len());

        let semaphore = Arc::new(Semaphore::new(self.author_concurrency));
        let mut set = tokio::task::JoinSet::new();

        for author_id in missing {
            let cache = self.cache.clone();
            let builder = self.builder.clone();
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::internal(format!("author fetch semaphore closed: {}", e)))?;

            set.spawn(async move {
                let _permit = permit;
                let result = cache.get_or_fetch(&builder, &author_id).await;
                (author_id, result)
            });
        }

        while let Some(res) = set.join_next().await {
            match res {
                Ok((author_id, Ok(snapshot))) => {
                    metrics.authors_fetched += 1;
                    resolved.insert(author_id, snapshot);
                }
                Ok((author_id, Err(e))) => {
                    metrics.authors_failed += 1;
                    if e.is_error_level() {
                        warn!("Skipping posts by {}: [{}] {}", author_id, e.error_code(), e);
                    } else {
                        debug!("Skipping posts by {}: {}", author_id, e);
                    }
                }
                Err(e) => {
                    metrics.authors_failed += 1;
                    warn!("Author fetch task failed: {}", e);
                }
            }
        }

        Ok(resolved)
    }
}
