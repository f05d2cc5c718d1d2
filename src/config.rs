//! Configuration management for the collector
//!
//! Strongly-typed configuration with validation and defaults, read from the
//! environment (optionally seeded from `.env` or a mounted secrets folder).
//!
//! # Example
//! ```no_run
//! use graph_research::Config;
//! let config = Config::from_env().expect("failed to load config");
//! println!("Graph API: {}", config.graph.base_url);
//! ```

use crate::collector::FriendDepth;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Default Graph API endpoint
pub const GRAPH_API_URL: &str = "https://graph.facebook.com";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Graph API client configuration
    pub graph: GraphApiConfig,
    /// Collection run configuration
    pub collector: CollectorConfig,
    /// Where training sets are written
    pub output: OutputConfig,
}

/// Graph API client configuration
#[derive(Clone)]
pub struct GraphApiConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Bearer token attached to every call
    pub access_token: Option<String>,
    /// Per-request deadline
    pub request_timeout: Duration,
    /// Page sizes for the connections a snapshot reads
    pub limits: ConnectionLimits,
}

/// Page sizes for snapshot connections. Only the first page is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    pub friends: u32,
    pub feed: u32,
    pub likes: u32,
}

/// Collection run configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Root user id ("me" resolves to the token owner)
    pub user_id: String,
    /// How far the root snapshot follows the friend list
    pub friend_depth: FriendDepth,
    /// Max posts sampled from the owner's wall
    pub sample_limit: usize,
    /// Window ending at a post's timestamp used for interaction counts
    pub interaction_window: chrono::Duration,
    /// Concurrent author snapshot fetches
    pub author_concurrency: usize,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            friends: 100,
            feed: 250,
            likes: 250,
        }
    }
}

impl Default for GraphApiConfig {
    fn default() -> Self {
        Self {
            base_url: GRAPH_API_URL.to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
            limits: ConnectionLimits::default(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            user_id: "me".to_string(),
            friend_depth: FriendDepth::Recursive,
            sample_limit: 200,
            interaction_window: chrono::Duration::hours(72),
            author_concurrency: 4,
        }
    }
}

// The token must never end up in logs.
impl std::fmt::Debug for GraphApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphApiConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "****"))
            .field("request_timeout", &self.request_timeout)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Platforms that mount secrets as files: FFOLDER holds one file per variable.
        if let Ok(folder) = std::env::var("FFOLDER") {
            let p = std::path::Path::new(&folder);
            if p.is_dir() {
                match std::fs::read_dir(p) {
                    Ok(entries) => {
                        for entry in entries.flatten() {
                            let fpath = entry.path();
                            if !fpath.is_file() {
                                continue;
                            }
                            if let (Ok(fname), Ok(contents)) = (
                                entry.file_name().into_string(),
                                std::fs::read_to_string(&fpath),
                            ) {
                                // Already-set variables win over mounted files
                                if std::env::var(&fname).is_err() {
                                    std::env::set_var(&fname, contents.trim());
                                }
                            }
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read FFOLDER {}: {}", folder, err);
                    }
                }
                info!("Loaded configuration from FFOLDER={}", folder);
            }
        } else {
            dotenvy::dotenv().ok();
        }

        let config = Self {
            graph: GraphApiConfig::from_env()?,
            collector: CollectorConfig::from_env()?,
            output: OutputConfig::from_env(),
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = &self.graph.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig {
                key: "GRAPH_API_URL",
                message: format!("Graph API URL must be http(s): {}", url).into(),
            });
        }

        for (key, value) in [
            ("GRAPH_FRIENDS_LIMIT", self.graph.limits.friends as usize),
            ("GRAPH_FEED_LIMIT", self.graph.limits.feed as usize),
            ("GRAPH_LIKES_LIMIT", self.graph.limits.likes as usize),
            ("COLLECT_SAMPLE_LIMIT", self.collector.sample_limit),
            ("COLLECT_AUTHOR_CONCURRENCY", self.collector.author_concurrency),
        ] {
            if value == 0 {
                return Err(Error::InvalidConfig {
                    key,
                    message: "must be greater than zero".into(),
                });
            }
        }

        if self.graph.request_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                key: "GRAPH_REQUEST_TIMEOUT_SECS",
                message: "must be greater than zero".into(),
            });
        }

        if self.collector.interaction_window <= chrono::Duration::zero() {
            return Err(Error::InvalidConfig {
                key: "COLLECT_INTERACTION_WINDOW_HOURS",
                message: "must be greater than zero".into(),
            });
        }

        if self.collector.user_id.is_empty() {
            return Err(Error::InvalidConfig {
                key: "COLLECT_USER_ID",
                message: "user id cannot be empty".into(),
            });
        }

        Ok(())
    }

    /// Log configuration summary (without sensitive data)
    fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  Graph API:");
        info!("    URL: {}", self.graph.base_url);
        info!(
            "    Access token: {}",
            if self.graph.access_token.is_some() { "set" } else { "not set" }
        );
        info!("    Request timeout: {:?}", self.graph.request_timeout);
        info!(
            "    Page sizes: friends={} feed={} likes={}",
            self.graph.limits.friends, self.graph.limits.feed, self.graph.limits.likes
        );
        info!("  Collector:");
        info!("    User: {}", self.collector.user_id);
        info!("    Friend depth: {}", self.collector.friend_depth);
        info!("    Sample limit: {}", self.collector.sample_limit);
        info!(
            "    Interaction window: {}h",
            self.collector.interaction_window.num_hours()
        );
        info!("  Output:");
        info!("    Directory: {}", self.output.dir.display());
    }
}

impl GraphApiConfig {
    fn from_env() -> Result<Self> {
        let access_token = std::env::var("GRAPH_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        Ok(Self {
            base_url: get_env_or("GRAPH_API_URL", GRAPH_API_URL)
                .trim_end_matches('/')
                .to_string(),
            access_token,
            request_timeout: Duration::from_secs(get_env_parsed_or(
                "GRAPH_REQUEST_TIMEOUT_SECS",
                30,
            )?),
            limits: ConnectionLimits {
                friends: get_env_parsed_or("GRAPH_FRIENDS_LIMIT", 100)?,
                feed: get_env_parsed_or("GRAPH_FEED_LIMIT", 250)?,
                likes: get_env_parsed_or("GRAPH_LIKES_LIMIT", 250)?,
            },
        })
    }
}

impl CollectorConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            user_id: get_env_or("COLLECT_USER_ID", "me"),
            friend_depth: get_env_parsed_or("COLLECT_FRIEND_DEPTH", FriendDepth::Recursive)?,
            sample_limit: get_env_parsed_or("COLLECT_SAMPLE_LIMIT", 200)?,
            interaction_window: interaction_window_from_hours(get_env_parsed_or(
                "COLLECT_INTERACTION_WINDOW_HOURS",
                72,
            )?)?,
            author_concurrency: get_env_parsed_or("COLLECT_AUTHOR_CONCURRENCY", 4)?,
        })
    }
}

impl OutputConfig {
    fn from_env() -> Self {
        Self {
            dir: PathBuf::from(get_env_or("OUTPUT_DIR", "userdata")),
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get environment variable with default
fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn interaction_window_from_hours(hours: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_hours(hours).ok_or_else(|| Error::InvalidConfig {
        key: "COLLECT_INTERACTION_WINDOW_HOURS",
        message: format!("{} hours is out of range", hours).into(),
    })
}

/// Parse an environment variable, falling back to `default` when unset.
/// A set but unparseable value is a configuration error, not a silent default.
fn get_env_parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
            key,
            message: format!("Invalid value '{}': {}", value, e).into(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            graph: GraphApiConfig::default(),
            collector: CollectorConfig::default(),
            output: OutputConfig {
                dir: PathBuf::from("userdata"),
            },
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut cfg = config();
        cfg.graph.base_url = "graph.facebook.com".to_string();
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidConfig { key: "GRAPH_API_URL", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut cfg = config();
        cfg.graph.limits.feed = 0;
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidConfig { key: "GRAPH_FEED_LIMIT", .. })
        ));

        let mut cfg = config();
        cfg.collector.author_concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_interaction_window_out_of_range_is_error() {
        assert_eq!(
            interaction_window_from_hours(72).unwrap(),
            chrono::Duration::days(3)
        );
        assert!(matches!(
            interaction_window_from_hours(i64::MAX),
            Err(Error::InvalidConfig {
                key: "COLLECT_INTERACTION_WINDOW_HOURS",
                ..
            })
        ));
    }

    #[test]
    fn test_debug_masks_token() {
        let mut graph = GraphApiConfig::default();
        graph.access_token = Some("EAAB-secret".to_string());
        let rendered = format!("{:?}", graph);
        assert!(!rendered.contains("EAAB-secret"));
        assert!(rendered.contains("****"));
    }
}
