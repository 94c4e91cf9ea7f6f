//! Engine configuration.
//!
//! A single immutable [`EngineConfig`] is carried alongside an
//! [`InformationState`](crate::types::InformationState) for the lifetime of
//! a session. No rule effect ever mutates it; this keeps rule effects pure
//! functions of `(config, state, input)`.

use std::collections::HashSet;
use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration-time errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("environment variable error: {message}")]
    EnvError { message: String },
}

/// Grounding strategy selection (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundingStrategy {
    Optimistic,
    Cautious,
    Pessimistic,
}

impl Default for GroundingStrategy {
    fn default() -> Self {
        GroundingStrategy::Cautious
    }
}

impl GroundingStrategy {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "optimistic" => Some(Self::Optimistic),
            "cautious" => Some(Self::Cautious),
            "pessimistic" => Some(Self::Pessimistic),
            _ => None,
        }
    }
}

/// Policy for a `depends` registration that would close a cycle (spec §4.7, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyCyclePolicy {
    /// Reject the registration at domain-build time.
    Error,
    /// Silently drop the offending edge.
    Drop,
}

impl Default for DependencyCyclePolicy {
    fn default() -> Self {
        DependencyCyclePolicy::Error
    }
}

/// Confidence thresholds used to classify an inbound move's grounding status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundingConfig {
    pub strategy: GroundingStrategy,
    /// Confidence at or above which a move is immediately `Grounded`.
    pub grounded_threshold: f32,
    /// Confidence at or above which a move is `Pending` (below is `Ungrounded`).
    pub pending_threshold: f32,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            strategy: GroundingStrategy::default(),
            grounded_threshold: 0.9,
            pending_threshold: 0.6,
        }
    }
}

/// Top-level engine configuration (spec §6 "Configuration (recognized options)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub grounding: GroundingConfig,
    pub max_reraise_attempts: u8,
    pub max_plan_depth: u16,
    pub critical_entity_predicates: HashSet<String>,
    pub dependency_cycle_policy: DependencyCyclePolicy,
    /// Safety valve backing spec §7's `RuleNonterminationSuspected`: a phase
    /// fixpoint that exceeds this many rule applications aborts the turn
    /// rather than looping forever.
    pub max_phase_fixpoint_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grounding: GroundingConfig::default(),
            max_reraise_attempts: 3,
            max_plan_depth: 16,
            critical_entity_predicates: HashSet::new(),
            dependency_cycle_policy: DependencyCyclePolicy::default(),
            max_phase_fixpoint_steps: 256,
        }
    }
}

impl EngineConfig {
    /// Validate configuration invariants, mirroring the struct-of-substructs
    /// `validate()` pattern used throughout the runtime's own `Config`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grounding.grounded_threshold < self.grounding.pending_threshold {
            return Err(ConfigError::InvalidValue {
                key: "grounding.grounded_threshold".to_string(),
                reason: "must be >= grounding.pending_threshold".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.grounding.grounded_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "grounding.grounded_threshold".to_string(),
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.grounding.pending_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "grounding.pending_threshold".to_string(),
                reason: "must be in [0, 1]".to_string(),
            });
        }
        if self.max_reraise_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_reraise_attempts".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.max_plan_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_plan_depth".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.max_phase_fixpoint_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_phase_fixpoint_steps".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Load overrides from the process environment on top of [`Default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(strategy) = env::var("DIALOGUE_GROUNDING_STRATEGY") {
            config.grounding.strategy =
                GroundingStrategy::from_str_loose(&strategy).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        key: "DIALOGUE_GROUNDING_STRATEGY".to_string(),
                        reason: format!("unrecognized strategy '{strategy}'"),
                    }
                })?;
        }

        if let Ok(attempts) = env::var("DIALOGUE_MAX_RERAISE_ATTEMPTS") {
            config.max_reraise_attempts =
                attempts.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DIALOGUE_MAX_RERAISE_ATTEMPTS".to_string(),
                    reason: "not a valid u8".to_string(),
                })?;
        }

        if let Ok(depth) = env::var("DIALOGUE_MAX_PLAN_DEPTH") {
            config.max_plan_depth = depth.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DIALOGUE_MAX_PLAN_DEPTH".to_string(),
                reason: "not a valid u16".to_string(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}
