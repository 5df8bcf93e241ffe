use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use cwn_api::CowinApi;
use cwn_core::AppError;
use cwn_core::types::Credential;

use crate::auth::AuthFlow;
use crate::operator::Operator;

/// What one bounded pass of a stage resolved.
pub enum StageStatus<T> {
    Done(T),
    /// The pass ran out of window or token; the supervisor decides whether
    /// to go again.
    Unresolved,
}

/// A bounded operation the supervisor can drive: one pass over a search or
/// booking window with a uniform `(args, credential) -> outcome` shape.
#[async_trait]
pub trait Stage: Send {
    type Outcome: Send;

    /// Question put to the operator before another pass.
    fn retry_question(&self) -> &str;

    async fn run(
        &mut self,
        api: &dyn CowinApi,
        credential: &Credential,
    ) -> Result<StageStatus<Self::Outcome>>;

    /// Hook invoked after the supervisor swapped in a fresh credential,
    /// before the next pass.
    async fn on_reauthenticated(
        &mut self,
        api: &dyn CowinApi,
        credential: &Credential,
    ) -> Result<()> {
        let _ = (api, credential);
        Ok(())
    }
}

/// The single retry policy shared by the search and booking stages.
///
/// Retries consume the same scarce resource as a first attempt, so every
/// "go again?" decision is deferred to the operator instead of looping
/// automatically. Re-authentication is owned here, not by the stages: a
/// stage only ever reports Unresolved and gets handed the latest credential.
pub struct Supervisor<'a> {
    api: &'a dyn CowinApi,
    operator: &'a dyn Operator,
    auth: &'a AuthFlow<'a>,
}

impl<'a> Supervisor<'a> {
    pub fn new(api: &'a dyn CowinApi, operator: &'a dyn Operator, auth: &'a AuthFlow<'a>) -> Self {
        Self {
            api,
            operator,
            auth,
        }
    }

    /// Drive `stage` to a terminal outcome. Returns the outcome together
    /// with whichever credential was current at the end, so the next phase
    /// keeps using it. Declining a retry ends the run with
    /// [`AppError::Declined`].
    pub async fn supervise<S: Stage>(
        &self,
        mut stage: S,
        credential: Credential,
    ) -> Result<(S::Outcome, Credential)> {
        let mut credential = credential;
        loop {
            if let StageStatus::Done(outcome) = stage.run(self.api, &credential).await? {
                return Ok((outcome, credential));
            }

            let now = Utc::now();
            info!(
                remaining_secs = credential.remaining(now).num_seconds(),
                "token lifetime"
            );
            if credential.is_expired(now) {
                info!("token expired, running the OTP handshake again");
                credential = self.auth.authenticate().await?;
                stage.on_reauthenticated(self.api, &credential).await?;
            }

            if !self.operator.confirm(stage.retry_question()).await? {
                return Err(AppError::Declined.into());
            }
        }
    }
}
