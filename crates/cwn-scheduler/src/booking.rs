use std::ops::RangeInclusive;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{info, warn};

use chrono::Utc;
use cwn_api::{CowinApi, ScheduleRequest};
use cwn_core::types::{BookingOutcome, Credential};

use crate::delay::{BOOKING_JITTER_MS, jittered};
use crate::operator::CaptchaSource;
use crate::supervise::{Stage, StageStatus};

/// Hard wall-clock bound on one booking pass. Shorter than the search
/// window: by now the slot exists and either commits quickly or is lost.
const BOOKING_WINDOW: Duration = Duration::from_secs(3 * 60);

/// Bounded reservation-commit loop against the schedule endpoint.
#[derive(Debug, Clone)]
pub struct BookingLoop {
    window: Duration,
    jitter_ms: RangeInclusive<u64>,
}

impl Default for BookingLoop {
    fn default() -> Self {
        Self {
            window: BOOKING_WINDOW,
            jitter_ms: BOOKING_JITTER_MS,
        }
    }
}

impl BookingLoop {
    #[cfg(test)]
    pub(crate) fn with_window(window: Duration, jitter_ms: RangeInclusive<u64>) -> Self {
        Self { window, jitter_ms }
    }

    /// Attempt the reservation until it confirms, is hard-rejected, the
    /// window elapses, or the token goes stale.
    ///
    /// A 409 means the slot was taken by someone else; re-attempting it is
    /// pointless, so the loop ends immediately with
    /// [`BookingOutcome::Rejected`]. A 200 without a confirmation number is
    /// ambiguous server behavior, logged in full and treated as transient.
    pub async fn run(
        &self,
        api: &dyn CowinApi,
        request: &ScheduleRequest,
        credential: &Credential,
    ) -> Result<BookingOutcome> {
        info!("attempting to commit the reservation");
        let deadline = Instant::now() + self.window;
        while Instant::now() < deadline {
            if credential.is_expired(Utc::now()) {
                warn!("token expired mid-booking, handing back");
                return Ok(BookingOutcome::Inconclusive);
            }
            let reply = api.schedule(request, credential).await?;
            if let Some(confirmation) = reply.confirmation_no() {
                return Ok(BookingOutcome::Confirmed(confirmation.to_string()));
            }
            if reply.is_conflict() {
                info!("slot already taken (409)");
                return Ok(BookingOutcome::Rejected);
            }
            if reply.is_success() {
                warn!(body = %reply.body, "success status without confirmation number");
            } else {
                warn!(status = reply.status, "schedule attempt not accepted");
            }
            tokio::time::sleep(jittered(self.jitter_ms.clone())).await;
        }
        info!("booking window elapsed without a verdict");
        Ok(BookingOutcome::Inconclusive)
    }
}

/// Terminal result of a supervised booking. An inconclusive pass never
/// leaves the supervision loop, so callers only ever see these two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingVerdict {
    Confirmed(String),
    Rejected,
}

/// Supervised wrapper around [`BookingLoop`]. Holds the request across
/// retries and swaps in a fresh captcha transcription whenever the
/// supervisor re-authenticates.
pub struct BookingStage<'a> {
    request: ScheduleRequest,
    captcha: &'a dyn CaptchaSource,
    inner: BookingLoop,
}

impl<'a> BookingStage<'a> {
    pub fn new(request: ScheduleRequest, captcha: &'a dyn CaptchaSource) -> Self {
        Self {
            request,
            captcha,
            inner: BookingLoop::default(),
        }
    }
}

#[async_trait]
impl Stage for BookingStage<'_> {
    type Outcome = BookingVerdict;

    fn retry_question(&self) -> &str {
        "Try to schedule again?"
    }

    async fn run(
        &mut self,
        api: &dyn CowinApi,
        credential: &Credential,
    ) -> Result<StageStatus<BookingVerdict>> {
        match self.inner.run(api, &self.request, credential).await? {
            BookingOutcome::Confirmed(confirmation) => {
                Ok(StageStatus::Done(BookingVerdict::Confirmed(confirmation)))
            }
            BookingOutcome::Rejected => Ok(StageStatus::Done(BookingVerdict::Rejected)),
            BookingOutcome::Inconclusive => Ok(StageStatus::Unresolved),
        }
    }

    async fn on_reauthenticated(
        &mut self,
        api: &dyn CowinApi,
        credential: &Credential,
    ) -> Result<()> {
        // The old transcription belonged to the old token.
        self.request.captcha = self.captcha.transcribe(api, credential).await?;
        Ok(())
    }
}
