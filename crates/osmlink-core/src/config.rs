//! Configuration for resolution and simplification settings.
//!
//! Load order: `.osmlink/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Top-level osmlink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OsmlinkConfig {
    pub resolve: ResolveConfig,
    pub simplify: SimplifyConfig,
}

/// How the resolver reads its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Reset the source before each phase. Three passes, nothing buffered
    /// except pending composites.
    #[default]
    Restream,
    /// Pull the source once and replay phases from memory.
    Buffer,
}

/// Order of the emitted complete elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputOrder {
    /// Points, then polylines, then composites; stream order within each.
    #[default]
    Grouped,
    /// Exactly the order the flat elements were streamed in.
    Stream,
}

/// Resolver configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    pub strategy: Strategy,
    pub order: OutputOrder,
    /// Materialize polylines on the rayon pool. Only applies to buffered input.
    pub parallel: bool,
}

/// Curve simplification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    /// Maximum perpendicular deviation, in coordinate degrees.
    pub tolerance: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self { tolerance: 0.00001 }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Restream => "restream",
            Strategy::Buffer => "buffer",
        })
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "restream" => Ok(Strategy::Restream),
            "buffer" => Ok(Strategy::Buffer),
            other => anyhow::bail!("unknown strategy '{}' (expected restream or buffer)", other),
        }
    }
}

impl fmt::Display for OutputOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputOrder::Grouped => "grouped",
            OutputOrder::Stream => "stream",
        })
    }
}

impl FromStr for OutputOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "grouped" => Ok(OutputOrder::Grouped),
            "stream" => Ok(OutputOrder::Stream),
            other => anyhow::bail!("unknown output order '{}' (expected grouped or stream)", other),
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl OsmlinkConfig {
    /// Load config from `.osmlink/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".osmlink").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override("OSMLINK_STRATEGY", &mut config.resolve.strategy);
        env_override("OSMLINK_ORDER", &mut config.resolve.order);
        env_override("OSMLINK_PARALLEL", &mut config.resolve.parallel);
        env_override("OSMLINK_SIMPLIFY_TOLERANCE", &mut config.simplify.tolerance);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let tolerance = self.simplify.tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            anyhow::bail!(
                "simplify.tolerance must be a positive number, got {}",
                tolerance
            );
        }
        Ok(())
    }
}
