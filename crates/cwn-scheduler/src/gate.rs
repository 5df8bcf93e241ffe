use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use cwn_core::AppError;

/// Resolution of the final spin-wait. Sub-200ms keeps the overshoot past
/// the launch instant negligible next to network latency.
const SPIN_RESOLUTION: Duration = Duration::from_millis(150);

/// Default seconds of token-lifetime headroom reserved before the launch
/// instant for the OTP handshake and captcha transcription.
pub const DEFAULT_BUFFER: Duration = Duration::from_secs(300);

/// Two-phase wait for the slot-release instant.
///
/// Phase one sleeps coarsely to `buffer` before the target, which is when
/// authentication should happen so the token still covers the launch
/// moment. Phase two spins finely to the target itself.
#[derive(Debug, Clone)]
pub struct LaunchGate {
    buffer: Duration,
}

impl Default for LaunchGate {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl LaunchGate {
    pub fn new(buffer: Duration) -> Self {
        Self { buffer }
    }

    /// Sleep until `buffer` before `target`. A target already in the past
    /// is a configuration error, raised before any network call is made.
    pub async fn coarse_wait(&self, target: DateTime<Utc>) -> Result<()> {
        let remaining = target - Utc::now();
        if remaining < chrono::Duration::zero() {
            return Err(AppError::Config("start time must be in the future".into()).into());
        }
        if let Some(sleep_for) = coarse_delay(remaining, self.buffer) {
            info!(
                minutes = sleep_for.as_secs().div_ceil(60),
                "sleeping until the pre-launch buffer"
            );
            tokio::time::sleep(sleep_for).await;
        }
        Ok(())
    }

    /// Fine-grained wait to the exact instant, re-checking the remaining
    /// time every iteration. Returns immediately if the target has passed.
    pub async fn spin_to(&self, target: DateTime<Utc>) {
        loop {
            let Ok(remaining) = (target - Utc::now()).to_std() else {
                break;
            };
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(remaining.min(SPIN_RESOLUTION)).await;
        }
        info!("launch instant reached");
    }
}

fn coarse_delay(remaining: chrono::Duration, buffer: Duration) -> Option<Duration> {
    let remaining = remaining.to_std().ok()?;
    if remaining > buffer {
        Some(remaining - buffer)
    } else {
        None
    }
}
