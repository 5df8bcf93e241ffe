use std::ops::RangeInclusive;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, Utc};
use tokio::time::Instant;
use tracing::{info, warn};

use cwn_api::{CalendarQuery, CowinApi};
use cwn_core::types::{Credential, SearchCriteria, SelectedSlot};

use crate::delay::{SEARCH_JITTER_MS, jittered};
use crate::filter::eligible_session;
use crate::supervise::{Stage, StageStatus};

/// Hard wall-clock bound on one search pass.
const SEARCH_WINDOW: Duration = Duration::from_secs(7 * 60);

/// Bounded availability poll against the calendar endpoint.
#[derive(Debug, Clone)]
pub struct SearchLoop {
    window: Duration,
    jitter_ms: RangeInclusive<u64>,
}

impl Default for SearchLoop {
    fn default() -> Self {
        Self {
            window: SEARCH_WINDOW,
            jitter_ms: SEARCH_JITTER_MS,
        }
    }
}

impl SearchLoop {
    #[cfg(test)]
    pub(crate) fn with_window(window: Duration, jitter_ms: RangeInclusive<u64>) -> Self {
        Self { window, jitter_ms }
    }

    /// Poll until a slot matches, the window elapses, or the token goes
    /// stale. `None` means nothing was found — never an error: this
    /// endpoint returns non-2xx during benign rate limiting, so transport
    /// failures only log and the loop keeps going.
    pub async fn run(
        &self,
        api: &dyn CowinApi,
        criteria: &SearchCriteria,
        credential: &Credential,
    ) -> Result<Option<SelectedSlot>> {
        info!("searching for an open session");
        let deadline = Instant::now() + self.window;
        while Instant::now() < deadline {
            if credential.is_expired(Utc::now()) {
                warn!("token expired mid-search, handing back");
                return Ok(None);
            }
            let query = CalendarQuery::from_criteria(criteria, Local::now().date_naive());
            match api.calendar(&query, credential).await {
                Ok(centers) => {
                    if let Some(selected) = eligible_session(&centers, criteria) {
                        return Ok(Some(selected));
                    }
                }
                Err(err) => warn!("calendar poll failed: {err:#}"),
            }
            tokio::time::sleep(jittered(self.jitter_ms.clone())).await;
        }
        info!("search window elapsed without a matching session");
        Ok(None)
    }
}

/// Supervised wrapper around [`SearchLoop`].
pub struct SearchStage<'a> {
    criteria: &'a SearchCriteria,
    inner: SearchLoop,
}

impl<'a> SearchStage<'a> {
    pub fn new(criteria: &'a SearchCriteria) -> Self {
        Self {
            criteria,
            inner: SearchLoop::default(),
        }
    }
}

#[async_trait]
impl Stage for SearchStage<'_> {
    type Outcome = SelectedSlot;

    fn retry_question(&self) -> &str {
        "Search again?"
    }

    async fn run(
        &mut self,
        api: &dyn CowinApi,
        credential: &Credential,
    ) -> Result<StageStatus<SelectedSlot>> {
        match self.inner.run(api, self.criteria, credential).await? {
            Some(selected) => Ok(StageStatus::Done(selected)),
            None => Ok(StageStatus::Unresolved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, criteria_45_plus_free, expired_credential, fresh_credential};
    use cwn_core::types::{Center, Session};

    fn matching_center() -> Center {
        Center {
            center_id: 7,
            name: "Test Center".into(),
            pincode: 400001,
            fee_type: "Free".into(),
            sessions: vec![Session {
                session_id: "s7".into(),
                vaccine: "COVISHIELD".into(),
                min_age_limit: 45,
                available_capacity_dose1: 5,
                available_capacity_dose2: 0,
                slots: vec!["09:00AM-11:00AM".into()],
            }],
        }
    }

    fn empty_center() -> Center {
        let mut center = matching_center();
        center.sessions[0].available_capacity_dose1 = 0;
        center
    }

    #[tokio::test]
    async fn test_scenario_a_match_on_first_iteration() {
        let api = FakeApi::new().with_centers(vec![matching_center()]);
        let slot = SearchLoop::default()
            .run(&api, &criteria_45_plus_free(), &fresh_credential())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(slot.center_id, 7);
        assert_eq!(slot.session_id, "s7");
        assert_eq!(slot.slot, "09:00AM-11:00AM");
        assert_eq!(api.calendar_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_b_zero_capacity_exhausts_window() {
        let api = FakeApi::new().with_centers(vec![empty_center()]);
        let result = SearchLoop::default()
            .run(&api, &criteria_45_plus_free(), &fresh_credential())
            .await
            .unwrap();
        assert!(result.is_none());
        // 7 minute window over 1.5-2.5s sleeps: somewhere between 168 and
        // 280 polls, one per iteration.
        let calls = api.calendar_calls();
        assert!((168..=280).contains(&calls), "unexpected poll count {calls}");
    }

    #[tokio::test]
    async fn test_scenario_d_expired_token_returns_without_querying() {
        let api = FakeApi::new().with_centers(vec![matching_center()]);
        let result = SearchLoop::default()
            .run(&api, &criteria_45_plus_free(), &expired_credential())
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(api.calendar_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_soft() {
        let api = FakeApi::new().failing_calendar();
        let result = SearchLoop::with_window(Duration::from_secs(5), 1500..=2500)
            .run(&api, &criteria_45_plus_free(), &fresh_credential())
            .await
            .unwrap();
        assert!(result.is_none());
        // The loop kept polling through the failures instead of bailing.
        assert!(api.calendar_calls() > 1);
    }

    #[tokio::test]
    async fn test_stage_reports_done_on_match() {
        let api = FakeApi::new().with_centers(vec![matching_center()]);
        let criteria = criteria_45_plus_free();
        let mut stage = SearchStage::new(&criteria);
        assert_eq!(stage.retry_question(), "Search again?");
        match stage.run(&api, &fresh_credential()).await.unwrap() {
            StageStatus::Done(slot) => assert_eq!(slot.center_id, 7),
            StageStatus::Unresolved => panic!("expected a match"),
        }
    }
}
