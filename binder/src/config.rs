//! Binder configuration

use serde::{Deserialize, Serialize};

/// Nesting depth allowed when no override is configured
pub const DEFAULT_MAX_DEPTH: usize = 32;

const MAX_DEPTH_VAR: &str = "BINDER_MAX_DEPTH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinderConfig {
    /// Deepest nested object or list element a bind call may reach. The
    /// top-level object is depth 0.
    pub max_depth: usize,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BinderConfig {
    /// Load overrides from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(depth_str) = std::env::var(MAX_DEPTH_VAR) {
            config.max_depth = parse_max_depth(&depth_str);
        }

        tracing::info!("Binder config loaded: max_depth={}", config.max_depth);

        config
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Parse a depth override. Anything that is not a positive integer falls back
/// to [`DEFAULT_MAX_DEPTH`].
pub fn parse_max_depth(raw: &str) -> usize {
    match raw.trim().parse::<usize>() {
        Ok(depth) if depth > 0 => depth,
        _ => {
            tracing::warn!(
                value = raw,
                default = DEFAULT_MAX_DEPTH,
                "invalid {}, using default",
                MAX_DEPTH_VAR
            );
            DEFAULT_MAX_DEPTH
        }
    }
}
