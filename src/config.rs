//! Kernel parameters.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! The similarity threshold is quantized to an integer before hashing
//! (multiply by 1,000,000 and round to i64), so `params_hash` does not depend
//! on float formatting.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::canonical_hash_hex;
use crate::KERNEL_PARAMS_VERSION;

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Default minimum normalized overlap for two slices to be the same object.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Environment variable overriding the similarity threshold.
pub const ENV_SIMILARITY_THRESHOLD: &str = "SLICE_KERNEL_SIMILARITY_THRESHOLD";

/// Environment variable overriding the singleton policy.
pub const ENV_SINGLETON_POLICY: &str = "SLICE_KERNEL_SINGLETON_POLICY";

/// Error type for configuration loading and validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Threshold outside `[0, 1]` or not a number.
    #[error("Similarity threshold must lie in [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
    /// An environment variable could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
    },
    /// JSON configuration could not be parsed.
    #[error("Invalid configuration JSON: {0}")]
    Json(String),
}

/// When constraint synthesis emits the singleton row `x_s <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingletonPolicy {
    /// Only for slices without any recorded conflict.
    Unconflicted,
    /// For every slice, in addition to its pairwise rows.
    Always,
}

impl SingletonPolicy {
    /// Parse a policy name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "unconflicted" => Some(Self::Unconflicted),
            "always" => Some(Self::Always),
            _ => None,
        }
    }
}

impl Default for SingletonPolicy {
    fn default() -> Self {
        Self::Unconflicted
    }
}

impl fmt::Display for SingletonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconflicted => write!(f, "unconflicted"),
            Self::Always => write!(f, "always"),
        }
    }
}

/// Parameters of duplicate consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Minimum normalized overlap `|A∩B| / (|A|+|B|−|A∩B|)` for which a
    /// deeper slice is considered a duplicate.
    pub similarity_threshold: f64,
}

impl ConsolidationConfig {
    /// Create a validated configuration.
    pub fn new(similarity_threshold: f64) -> Result<Self, ConfigError> {
        let config = Self {
            similarity_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the threshold range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&self.similarity_threshold) {
            Ok(())
        } else {
            Err(ConfigError::ThresholdOutOfRange(self.similarity_threshold))
        }
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Parameters of constraint synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Singleton row policy.
    pub singleton_policy: SingletonPolicy,
}

/// Complete kernel configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Duplicate consolidation.
    pub consolidation: ConsolidationConfig,
    /// Constraint synthesis.
    pub synthesis: SynthesisConfig,
}

/// Quantized parameters for deterministic hashing.
#[derive(Serialize)]
struct QuantizedKernelParams {
    version: &'static str,
    similarity_threshold: i64,
    singleton_policy: SingletonPolicy,
}

fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

impl KernelConfig {
    /// Parse and validate a JSON document; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SLICE_KERNEL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SIMILARITY_THRESHOLD) {
            config.consolidation.similarity_threshold =
                raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: ENV_SIMILARITY_THRESHOLD,
                    value: raw.clone(),
                })?;
        }

        if let Some(raw) = lookup(ENV_SINGLETON_POLICY) {
            config.synthesis.singleton_policy =
                SingletonPolicy::from_str(&raw).ok_or_else(|| ConfigError::InvalidEnv {
                    var: ENV_SINGLETON_POLICY,
                    value: raw.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.consolidation.validate()
    }

    /// Hash of the quantized parameters, recorded on every collection result.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&QuantizedKernelParams {
            version: KERNEL_PARAMS_VERSION,
            similarity_threshold: quantize_float(self.consolidation.similarity_threshold),
            singleton_policy: self.synthesis.singleton_policy,
        })
    }
}
