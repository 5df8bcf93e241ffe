//! In-memory fakes shared by the module tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};

use cwn_api::{CalendarQuery, CowinApi, ScheduleReply, ScheduleRequest};
use cwn_core::types::{
    AgeTier, Beneficiary, Center, Credential, Dose, FeeFilter, SearchCriteria,
};

use crate::operator::Operator;

/// Unsigned JWT whose only claim is `exp`, far enough out that tests never
/// see it expire.
pub(crate) fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}

const FAR_FUTURE_EXP: i64 = 4_102_444_800; // 2100-01-01

pub(crate) fn fresh_credential() -> Credential {
    Credential {
        token: FakeApi::token(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub(crate) fn expired_credential() -> Credential {
    Credential {
        token: "stale".into(),
        expires_at: Utc::now() - Duration::seconds(10),
    }
}

pub(crate) fn criteria_45_plus_free() -> SearchCriteria {
    SearchCriteria {
        pincodes: vec![],
        district_id: None,
        fee: FeeFilter::Free,
        vaccine: None,
        age_tier: AgeTier::FortyFivePlus,
        dose: Dose::One,
    }
}

pub(crate) fn schedule_request() -> ScheduleRequest {
    ScheduleRequest {
        dose: 1,
        captcha: "XyZ12".into(),
        center_id: 7,
        session_id: "s7".into(),
        beneficiaries: vec!["1234567890".into()],
        slot: "09:00AM-11:00AM".into(),
    }
}

/// Scriptable [`CowinApi`] that records call counts.
pub(crate) struct FakeApi {
    centers: Vec<Center>,
    beneficiaries: Vec<Beneficiary>,
    schedule_reply: ScheduleReply,
    calendar_fails: bool,
    otp_fails: bool,
    calendar_calls: AtomicUsize,
    schedule_calls: AtomicUsize,
    otp_requests: AtomicUsize,
    validated_otp: Mutex<Option<String>>,
    last_schedule_captcha: Mutex<Option<String>>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self {
            centers: Vec::new(),
            beneficiaries: Vec::new(),
            schedule_reply: ScheduleReply {
                status: 500,
                body: serde_json::Value::Null,
            },
            calendar_fails: false,
            otp_fails: false,
            calendar_calls: AtomicUsize::new(0),
            schedule_calls: AtomicUsize::new(0),
            otp_requests: AtomicUsize::new(0),
            validated_otp: Mutex::new(None),
            last_schedule_captcha: Mutex::new(None),
        }
    }

    pub(crate) fn token() -> String {
        make_token(FAR_FUTURE_EXP)
    }

    pub(crate) fn with_centers(mut self, centers: Vec<Center>) -> Self {
        self.centers = centers;
        self
    }

    pub(crate) fn with_schedule_reply(mut self, reply: ScheduleReply) -> Self {
        self.schedule_reply = reply;
        self
    }

    pub(crate) fn failing_calendar(mut self) -> Self {
        self.calendar_fails = true;
        self
    }

    pub(crate) fn failing_otp(mut self) -> Self {
        self.otp_fails = true;
        self
    }

    pub(crate) fn calendar_calls(&self) -> usize {
        self.calendar_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn otp_requests(&self) -> usize {
        self.otp_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn validated_otp(&self) -> Option<String> {
        self.validated_otp.lock().unwrap().clone()
    }

    pub(crate) fn last_schedule_captcha(&self) -> Option<String> {
        self.last_schedule_captcha.lock().unwrap().clone()
    }
}

#[async_trait]
impl CowinApi for FakeApi {
    async fn generate_otp(&self, _mobile: &str) -> Result<String> {
        if self.otp_fails {
            bail!("status 503");
        }
        self.otp_requests.fetch_add(1, Ordering::SeqCst);
        Ok("txn-1".into())
    }

    async fn validate_otp(&self, _txn_id: &str, otp_sha256_hex: &str) -> Result<String> {
        *self.validated_otp.lock().unwrap() = Some(otp_sha256_hex.to_string());
        Ok(Self::token())
    }

    async fn beneficiaries(&self, _credential: &Credential) -> Result<Vec<Beneficiary>> {
        Ok(self.beneficiaries.clone())
    }

    async fn calendar(
        &self,
        _query: &CalendarQuery,
        _credential: &Credential,
    ) -> Result<Vec<Center>> {
        self.calendar_calls.fetch_add(1, Ordering::SeqCst);
        if self.calendar_fails {
            bail!("status 403");
        }
        Ok(self.centers.clone())
    }

    async fn schedule(
        &self,
        request: &ScheduleRequest,
        _credential: &Credential,
    ) -> Result<ScheduleReply> {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_schedule_captcha.lock().unwrap() = Some(request.captcha.clone());
        Ok(self.schedule_reply.clone())
    }

    async fn recaptcha(&self, _credential: &Credential) -> Result<String> {
        Ok("<svg></svg>".into())
    }
}

/// Captcha source returning a fixed transcription and counting how often it
/// was asked.
pub(crate) struct FakeCaptcha {
    text: String,
    transcriptions: AtomicUsize,
}

impl FakeCaptcha {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            transcriptions: AtomicUsize::new(0),
        }
    }

    pub(crate) fn transcriptions(&self) -> usize {
        self.transcriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::operator::CaptchaSource for FakeCaptcha {
    async fn transcribe(&self, _api: &dyn CowinApi, _credential: &Credential) -> Result<String> {
        self.transcriptions.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Operator whose answers are queued up front. Running out of script is a
/// test bug and errors loudly.
#[derive(Default)]
pub(crate) struct ScriptedOperator {
    prompts: Mutex<VecDeque<String>>,
    confirms: Mutex<VecDeque<bool>>,
    confirms_asked: AtomicUsize,
}

impl ScriptedOperator {
    pub(crate) fn with_prompts(answers: Vec<&str>) -> Self {
        Self {
            prompts: Mutex::new(answers.into_iter().map(String::from).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn with_confirms(answers: Vec<bool>) -> Self {
        Self {
            confirms: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn and_confirms(self, answers: Vec<bool>) -> Self {
        *self.confirms.lock().unwrap() = answers.into_iter().collect();
        self
    }

    pub(crate) fn confirms_asked(&self) -> usize {
        self.confirms_asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn prompt(&self, question: &str) -> Result<String> {
        match self.prompts.lock().unwrap().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("unscripted prompt: {question}"),
        }
    }

    async fn confirm(&self, question: &str) -> Result<bool> {
        self.confirms_asked.fetch_add(1, Ordering::SeqCst);
        match self.confirms.lock().unwrap().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("unscripted confirmation: {question}"),
        }
    }
}
