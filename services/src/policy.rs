//! Tunable check-in policy.

use chrono::Duration;
use strum::{Display, EnumString};
use util::config;

/// What to do with a GPS fix coarser than the accuracy threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccuracyPolicy {
    /// Accept the check-in but record `location_verified = false`.
    Annotate,
    /// Refuse the check-in with `low_accuracy`.
    Reject,
}

#[derive(Debug, Clone)]
pub struct CheckInPolicy {
    /// Maximum allowed |server time - client timestamp|.
    pub clock_skew_tolerance: Duration,
    /// Check-ins up to this long after start count as `present`.
    pub grace_period: Duration,
    /// Replaces every session's own geofence radius when set.
    pub radius_override_m: Option<f64>,
    pub accuracy_threshold_m: f64,
    pub accuracy_policy: AccuracyPolicy,
    /// Rotation windows accepted on either side of the current one.
    pub code_window_tolerance: i64,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            clock_skew_tolerance: Duration::seconds(60),
            grace_period: Duration::minutes(5),
            radius_override_m: None,
            accuracy_threshold_m: 100.0,
            accuracy_policy: AccuracyPolicy::Annotate,
            code_window_tolerance: 1,
        }
    }
}

impl CheckInPolicy {
    /// Builds the policy from the global [`config`].
    pub fn from_config() -> Self {
        let accuracy_policy = config::accuracy_policy()
            .parse()
            .unwrap_or_else(|_| {
                tracing::warn!(
                    value = %config::accuracy_policy(),
                    "Unknown ACCURACY_POLICY; falling back to annotate"
                );
                AccuracyPolicy::Annotate
            });

        Self {
            clock_skew_tolerance: Duration::seconds(config::clock_skew_tolerance_seconds().max(0)),
            grace_period: Duration::seconds(config::grace_period_seconds().max(0)),
            radius_override_m: config::geofence_radius_override_meters().filter(|r| *r > 0.0),
            accuracy_threshold_m: config::accuracy_threshold_meters(),
            accuracy_policy,
            code_window_tolerance: config::code_window_tolerance().max(0),
        }
    }

    /// Radius that applies to a session whose own radius is `session_radius_m`.
    pub fn effective_radius(&self, session_radius_m: f64) -> f64 {
        self.radius_override_m.unwrap_or(session_radius_m)
    }
}
