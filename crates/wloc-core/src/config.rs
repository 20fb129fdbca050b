//! Spoofing configuration.
//!
//! Built once at startup and never mutated afterwards; connection handlers
//! share it read-only.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinates;

/// What the rewrite pipeline reports for every access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPolicy {
    /// Horizontal accuracy in meters.
    pub horizontal_accuracy: i64,
    /// Vertical accuracy in meters.
    pub vertical_accuracy: i64,
    /// Altitude in meters.
    pub altitude: i64,
    pub unknown_value4: i64,
    pub motion_activity_type: i64,
    pub motion_activity_confidence: i64,
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            horizontal_accuracy: 39,
            vertical_accuracy: 1000,
            altitude: 530,
            unknown_value4: 3,
            motion_activity_type: 63,
            motion_activity_confidence: 467,
        }
    }
}

/// Spoof target and on/off switch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpoofConfig {
    /// Coordinates reported to the client.
    pub coordinates: Coordinates,
    /// Whether location requests are rewritten at all.
    pub enabled: bool,
    #[serde(default)]
    pub policy: LocationPolicy,
}

impl SpoofConfig {
    /// Creates an enabled configuration for `coordinates` with the default policy.
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            enabled: true,
            policy: LocationPolicy::default(),
        }
    }

    /// Creates a disabled configuration. Location traffic is relayed untouched.
    pub fn disabled() -> Self {
        Self {
            coordinates: Coordinates::default(),
            enabled: false,
            policy: LocationPolicy::default(),
        }
    }

    /// Sets the location policy.
    pub fn with_policy(mut self, policy: LocationPolicy) -> Self {
        self.policy = policy;
        self
    }
}
