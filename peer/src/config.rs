//! Session timing and fault-injection settings.

use crate::error::PeerError;
use shared::{LEADER_HISTORY_DEPTH, LOCAL_HISTORY_DEPTH};
use std::time::Duration;

/// How many routine-update intervals a peer may stay silent before it is
/// suspected.
pub const DEFAULT_FAILURE_MULTIPLIER: u32 = 7;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period of the movement and collision pass.
    pub tick_interval: Duration,
    /// Period of routine updates and of the failure detector.
    pub update_interval: Duration,
    /// Period of the leader's reconciliation broadcast.
    pub reconcile_interval: Duration,
    /// Silence after which a peer is suspected.
    pub failure_threshold: Duration,
    pub leader_history_depth: usize,
    pub local_history_depth: usize,
    /// Probability in `[0, 1]` that an outgoing datagram is dropped.
    pub drop_rate: f64,
    /// Artificial delay applied before every send.
    pub fake_latency_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let update_interval = Duration::from_millis(1000);
        Self {
            tick_interval: Duration::from_millis(500),
            update_interval,
            reconcile_interval: Duration::from_millis(2000),
            failure_threshold: update_interval * DEFAULT_FAILURE_MULTIPLIER,
            leader_history_depth: LEADER_HISTORY_DEPTH,
            local_history_depth: LOCAL_HISTORY_DEPTH,
            drop_rate: 0.0,
            fake_latency_ms: 0,
        }
    }
}

impl SessionConfig {
    /// Builds a config from millisecond periods, deriving the failure
    /// threshold from the update interval.
    pub fn from_millis(
        tick_ms: u64,
        update_ms: u64,
        reconcile_ms: u64,
        multiplier: u32,
    ) -> Result<Self, PeerError> {
        let update_interval = Duration::from_millis(update_ms);
        let failure_threshold =
            update_interval
                .checked_mul(multiplier)
                .ok_or_else(|| PeerError::InvalidConfig {
                    reason: format!(
                        "failure threshold of {} x {:?} is out of range",
                        multiplier, update_interval
                    ),
                })?;

        Ok(Self {
            tick_interval: Duration::from_millis(tick_ms),
            update_interval,
            reconcile_interval: Duration::from_millis(reconcile_ms),
            failure_threshold,
            ..Self::default()
        })
    }

    pub fn with_faults(mut self, drop_rate: f64, fake_latency_ms: u64) -> Self {
        self.drop_rate = drop_rate;
        self.fake_latency_ms = fake_latency_ms;
        self
    }

    pub fn validate(&self) -> Result<(), PeerError> {
        let periods = [
            ("tick interval", self.tick_interval),
            ("update interval", self.update_interval),
            ("reconcile interval", self.reconcile_interval),
        ];
        for (name, period) in periods {
            if period.is_zero() {
                return Err(PeerError::InvalidConfig {
                    reason: format!("{} must be positive", name),
                });
            }
        }

        if self.failure_threshold <= self.update_interval {
            return Err(PeerError::InvalidConfig {
                reason: format!(
                    "failure threshold {:?} must exceed the update interval {:?}",
                    self.failure_threshold, self.update_interval
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(PeerError::InvalidConfig {
                reason: format!("drop rate {} is outside [0, 1]", self.drop_rate),
            });
        }

        if self.leader_history_depth == 0 || self.local_history_depth == 0 {
            return Err(PeerError::InvalidConfig {
                reason: "history depth must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
