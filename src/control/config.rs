//! Controller configuration.

use std::time::Duration;

use super::path::LossRate;

/// Tunables for the congestion controller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// Period of the control cycle driving measurements.
    pub control_cycle: Duration,
    /// Loss rate (basis points) above which a path counts as congested.
    pub loss_threshold: LossRate,
    /// Multiplier applied to every scaled timeout (simulation slow-down).
    pub time_scale: u32,
    /// Control cycles allowed for local resolution before escalating.
    pub local_resolution_cycles: u32,
    /// How long an expired path stays out of allocation.
    pub path_expiration: Duration,
    /// Back-off, in resolution timeouts, after a fairness pass that did nothing.
    pub action_backoff_factor: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_cycle: Duration::from_millis(200),
            loss_threshold: 100,
            time_scale: 1,
            local_resolution_cycles: 10,
            path_expiration: Duration::from_secs(30 * 60),
            action_backoff_factor: 10,
        }
    }
}

impl ControllerConfig {
    /// Baseline for "local resolution is taking too long".
    #[must_use]
    pub fn local_resolution_timeout(&self) -> Duration {
        self.control_cycle
            .saturating_mul(self.local_resolution_cycles)
    }

    /// Apply the time scale to a duration.
    #[must_use]
    pub fn scaled(&self, d: Duration) -> Duration {
        d.saturating_mul(self.time_scale.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_timeouts() {
        let config = ControllerConfig {
            time_scale: 3,
            ..ControllerConfig::default()
        };
        assert_eq!(config.local_resolution_timeout(), Duration::from_secs(2));
        assert_eq!(
            config.scaled(config.local_resolution_timeout()),
            Duration::from_secs(6)
        );
    }

    #[test]
    fn oversized_scaling_saturates() {
        let config = ControllerConfig {
            control_cycle: Duration::from_secs(u64::MAX / 2),
            time_scale: u32::MAX,
            ..ControllerConfig::default()
        };
        assert_eq!(config.local_resolution_timeout(), Duration::MAX);
        assert_eq!(config.scaled(config.path_expiration), Duration::from_secs(1_800) * u32::MAX);
        assert_eq!(config.scaled(Duration::MAX), Duration::MAX);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_partial_json() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"loss_threshold": 250, "time_scale": 2}"#).unwrap();
        assert_eq!(config.loss_threshold, 250);
        assert_eq!(config.time_scale, 2);
        assert_eq!(config.control_cycle, Duration::from_millis(200));
    }
}
