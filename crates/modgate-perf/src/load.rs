//! Load profiles and the load-driver seam.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PerfResult;

/// Phase of a load profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    RampUp,
    Hold,
    RampDown,
}

/// Time-shaped number of concurrent users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    pub initial_users: u32,
    pub target_users: u32,
    pub ramp_up_ms: u64,
    pub hold_ms: u64,
    pub ramp_down_ms: u64,
    /// Requests per user per second.
    pub request_rate: f64,
}

impl LoadProfile {
    pub fn phases(&self) -> [(LoadPhase, Duration); 3] {
        [
            (LoadPhase::RampUp, Duration::from_millis(self.ramp_up_ms)),
            (LoadPhase::Hold, Duration::from_millis(self.hold_ms)),
            (LoadPhase::RampDown, Duration::from_millis(self.ramp_down_ms)),
        ]
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.ramp_up_ms + self.hold_ms + self.ramp_down_ms)
    }

    /// Users at `elapsed` into a phase lasting `duration`. Ramps interpolate
    /// linearly; ramp-down ends at zero.
    pub fn users_at(&self, phase: LoadPhase, elapsed: Duration, duration: Duration) -> u32 {
        let progress = if duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        let lerp = |from: u32, to: u32| (from as f64 + (to as f64 - from as f64) * progress).round() as u32;

        match phase {
            LoadPhase::RampUp => lerp(self.initial_users, self.target_users),
            LoadPhase::Hold => self.target_users,
            LoadPhase::RampDown => lerp(self.target_users, 0),
        }
    }

    /// Cap both user counts at `max_users`.
    pub fn capped(mut self, max_users: u32) -> Self {
        let max_users = max_users.max(1);
        self.initial_users = self.initial_users.min(max_users);
        self.target_users = self.target_users.min(max_users);
        self
    }
}

/// Work handed to the driver for one step of the profile walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadRequest {
    pub phase: LoadPhase,
    pub users: u32,
    pub request_rate: f64,
    pub step: Duration,
}

/// What the driver observed during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStep {
    pub requests: u64,
    pub errors: u64,
    pub avg_response_ms: f64,
}

/// Issues load for one step and reports what it saw. Implementations
/// should take roughly `request.step` to return.
#[async_trait]
pub trait LoadDriver: Send + Sync {
    async fn drive(&self, request: LoadRequest) -> PerfResult<LoadStep>;

    fn name(&self) -> &str;
}

/// Driver that sleeps through each step and models response time as a
/// linear function of concurrent users.
#[derive(Debug, Clone)]
pub struct SyntheticLoadDriver {
    pub base_response_ms: f64,
    pub per_user_ms: f64,
    pub jitter_ms: f64,
}

impl Default for SyntheticLoadDriver {
    fn default() -> Self {
        Self {
            base_response_ms: 20.0,
            per_user_ms: 1.5,
            jitter_ms: 5.0,
        }
    }
}

impl SyntheticLoadDriver {
    /// Same model without jitter.
    pub fn deterministic() -> Self {
        Self {
            jitter_ms: 0.0,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LoadDriver for SyntheticLoadDriver {
    async fn drive(&self, request: LoadRequest) -> PerfResult<LoadStep> {
        let jitter = if self.jitter_ms > 0.0 {
            rand::thread_rng().gen_range(0.0..self.jitter_ms)
        } else {
            0.0
        };

        tokio::time::sleep(request.step).await;

        let requests = (request.users as f64 * request.request_rate * request.step.as_secs_f64()).round() as u64;
        Ok(LoadStep {
            requests,
            errors: 0,
            avg_response_ms: self.base_response_ms + self.per_user_ms * request.users as f64 + jitter,
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> LoadProfile {
        LoadProfile {
            initial_users: 10,
            target_users: 50,
            ramp_up_ms: 20_000,
            hold_ms: 60_000,
            ramp_down_ms: 20_000,
            request_rate: 2.0,
        }
    }

    #[test]
    fn users_interpolate_across_ramps() {
        let p = profile();
        let ramp = Duration::from_secs(20);

        assert_eq!(p.users_at(LoadPhase::RampUp, Duration::ZERO, ramp), 10);
        assert_eq!(p.users_at(LoadPhase::RampUp, Duration::from_secs(10), ramp), 30);
        assert_eq!(p.users_at(LoadPhase::RampUp, ramp, ramp), 50);
        assert_eq!(p.users_at(LoadPhase::Hold, Duration::from_secs(30), Duration::from_secs(60)), 50);
        assert_eq!(p.users_at(LoadPhase::RampDown, Duration::from_secs(5), ramp), 38);
        assert_eq!(p.users_at(LoadPhase::RampDown, ramp, ramp), 0);
    }

    #[test]
    fn capping_limits_both_ends() {
        let p = profile().capped(20);
        assert_eq!(p.initial_users, 10);
        assert_eq!(p.target_users, 20);
        assert_eq!(p.total_duration(), Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn synthetic_driver_scales_with_users() {
        let driver = SyntheticLoadDriver::deterministic();
        let step = driver
            .drive(LoadRequest {
                phase: LoadPhase::Hold,
                users: 10,
                request_rate: 2.0,
                step: Duration::from_millis(500),
            })
            .await
            .unwrap();

        assert_eq!(step.requests, 10);
        assert_eq!(step.errors, 0);
        assert!((step.avg_response_ms - 35.0).abs() < 1e-9);
    }
}
