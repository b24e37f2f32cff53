// crates/meeple-daemon/src/config.rs
//
// Runtime configuration for the Meeple recommender daemon.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use meeple_core::MeepleError;
use meeple_engine::{AbsentContentPolicy, BlendConfig};
use meeple_rpc::handlers::recommend::RequestLimits;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Path to the JSON model artifact.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,

    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Number of recommendations returned when a request omits `top_n`.
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    /// Largest `top_n` a request may ask for.
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    /// CF weight for a user with no ratings.
    #[serde(default = "default_blend_low")]
    pub blend_low: f64,

    /// CF weight once `blend_pivot` ratings are reached.
    #[serde(default = "default_blend_high")]
    pub blend_high: f64,

    #[serde(default = "default_blend_pivot")]
    pub blend_pivot: usize,

    /// "zero" or "collaborative_only".
    #[serde(default)]
    pub absent_content_policy: AbsentContentPolicy,

    /// Endpoint of the content-similarity service. When unset, only
    /// precomputed content scores reach the blend.
    #[serde(default)]
    pub content_url: Option<String>,

    /// Timeout for a single content-similarity call.
    #[serde(default = "default_content_timeout_secs")]
    pub content_timeout_secs: u64,

    /// Expected length of a request's `preferences` vector.
    #[serde(default)]
    pub num_preferences: Option<usize>,

    /// Lowest rating a request may carry.
    #[serde(default = "default_min_rating")]
    pub min_rating: f64,

    /// Highest rating a request may carry.
    #[serde(default = "default_max_rating")]
    pub max_rating: f64,
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    50061
}

fn default_artifact_path() -> String {
    "~/.meeple/model/artifact.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_n() -> usize {
    20
}

fn default_max_top_n() -> usize {
    500
}

fn default_blend_low() -> f64 {
    0.3
}

fn default_blend_high() -> f64 {
    0.8
}

fn default_blend_pivot() -> usize {
    10
}

fn default_content_timeout_secs() -> u64 {
    5
}

fn default_min_rating() -> f64 {
    0.0
}

fn default_max_rating() -> f64 {
    10.0
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            artifact_path: default_artifact_path(),
            log_level: default_log_level(),
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
            blend_low: default_blend_low(),
            blend_high: default_blend_high(),
            blend_pivot: default_blend_pivot(),
            absent_content_policy: AbsentContentPolicy::default(),
            content_url: None,
            content_timeout_secs: default_content_timeout_secs(),
            num_preferences: None,
            min_rating: default_min_rating(),
            max_rating: default_max_rating(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<(), MeepleError> {
        if !(self.min_rating.is_finite() && self.max_rating.is_finite())
            || self.min_rating > self.max_rating
        {
            return Err(MeepleError::Config(format!(
                "rating range [{}, {}] is not a finite interval",
                self.min_rating, self.max_rating
            )));
        }
        if self.default_top_n == 0 || self.default_top_n > self.max_top_n {
            return Err(MeepleError::Config(format!(
                "default_top_n {} must be in 1..={}",
                self.default_top_n, self.max_top_n
            )));
        }
        Ok(())
    }

    /// Blend parameters for the recommender.
    pub fn blend_config(&self) -> BlendConfig {
        BlendConfig {
            low: self.blend_low,
            high: self.blend_high,
            pivot: self.blend_pivot,
            absent_content: self.absent_content_policy,
        }
    }

    /// Boundary limits for recommend requests.
    pub fn limits(&self) -> RequestLimits {
        RequestLimits {
            default_top_n: self.default_top_n,
            max_top_n: self.max_top_n,
            num_preferences: self.num_preferences,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
        }
    }
}
