use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use cwn_core::AppError;
use cwn_core::types::{Beneficiary, Center, Credential, SearchCriteria};

use crate::DEFAULT_DISTRICT_ID;

pub const DEFAULT_BASE_URL: &str = "https://cdn-api.co-vin.in/api";

/// Cloudflare in front of the API drops requests from non-browser agents,
/// so every call impersonates a desktop Chrome.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36";

/// Pre-encrypted secret the CoWIN web client sends with every OTP request,
/// lifted verbatim from its bundled javascript. Not a key we derive — an
/// opaque literal the remote service can rotate at any time, which is why
/// the config file may override it.
pub const DEFAULT_OTP_SECRET: &str =
    "U2FsdGVkX1+z2q1fFt5vG8dWXBhJJGuKx9wXyPQ3N2Vt4iFhkSm0aA5lYyDqV7K3";

/// How the calendar endpoint is addressed for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarQuery {
    ByPin { pincode: u32, date: String },
    ByDistrict { district_id: u32, date: String },
}

impl CalendarQuery {
    /// Exactly one configured pincode addresses the calendar by pin;
    /// anything else falls back to the district (default 395).
    pub fn from_criteria(criteria: &SearchCriteria, date: NaiveDate) -> Self {
        let date = date.format("%d-%m-%Y").to_string();
        if criteria.pincodes.len() == 1 {
            Self::ByPin {
                pincode: criteria.pincodes[0],
                date,
            }
        } else {
            Self::ByDistrict {
                district_id: criteria.district_id.unwrap_or(DEFAULT_DISTRICT_ID),
                date,
            }
        }
    }
}

/// Body of `POST /appointment/schedule`.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRequest {
    pub dose: u8,
    pub captcha: String,
    pub center_id: u64,
    pub session_id: String,
    pub beneficiaries: Vec<String>,
    pub slot: String,
}

/// Raw reply from the schedule endpoint. The booking loop classifies it;
/// this type only carries the status and whatever body came back.
#[derive(Debug, Clone)]
pub struct ScheduleReply {
    pub status: u16,
    pub body: Value,
}

impl ScheduleReply {
    pub fn confirmation_no(&self) -> Option<&str> {
        self.body
            .get("appointment_confirmation_no")
            .and_then(Value::as_str)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The slice of the CoWIN API this workspace touches.
#[async_trait]
pub trait CowinApi: Send + Sync {
    /// Submit the mobile number, returning the OTP transaction id.
    async fn generate_otp(&self, mobile: &str) -> Result<String>;
    /// Exchange `{txnId, hashed otp}` for a bearer token.
    async fn validate_otp(&self, txn_id: &str, otp_sha256_hex: &str) -> Result<String>;
    async fn beneficiaries(&self, credential: &Credential) -> Result<Vec<Beneficiary>>;
    /// One calendar poll. Non-2xx is an error here; the search loop treats
    /// it as soft (the endpoint rate-limits benignly).
    async fn calendar(&self, query: &CalendarQuery, credential: &Credential)
    -> Result<Vec<Center>>;
    /// One booking attempt. Never errors on non-2xx — the status is data.
    async fn schedule(
        &self,
        request: &ScheduleRequest,
        credential: &Credential,
    ) -> Result<ScheduleReply>;
    /// Fetch the captcha challenge as SVG markup.
    async fn recaptcha(&self, credential: &Credential) -> Result<String>;
}

#[derive(Deserialize)]
struct OtpResponse {
    #[serde(rename = "txnId")]
    txn_id: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct BeneficiariesResponse {
    beneficiaries: Vec<Beneficiary>,
}

#[derive(Deserialize)]
struct CalendarResponse {
    #[serde(default)]
    centers: Vec<Center>,
}

#[derive(Deserialize)]
struct CaptchaResponse {
    captcha: String,
}

/// `reqwest`-backed [`CowinApi`] implementation.
#[derive(Debug)]
pub struct HttpApi {
    base_url: String,
    otp_secret: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, otp_secret: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            otp_secret: otp_secret.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2{}", self.base_url, path)
    }

    async fn expect_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &'static str,
    ) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read '{endpoint}' response body"))?;
        if !status.is_success() {
            return Err(AppError::UnexpectedResponse {
                endpoint,
                status: status.as_u16(),
                body,
            }
            .into());
        }
        serde_json::from_str(&body)
            .with_context(|| format!("malformed '{endpoint}' response: {body}"))
    }
}

#[async_trait]
impl CowinApi for HttpApi {
    async fn generate_otp(&self, mobile: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/generateMobileOTP"))
            .json(&json!({ "mobile": mobile, "secret": self.otp_secret }))
            .send()
            .await
            .context("OTP generation request failed")?;
        let otp: OtpResponse = Self::expect_json(response, "generateMobileOTP").await?;
        Ok(otp.txn_id)
    }

    async fn validate_otp(&self, txn_id: &str, otp_sha256_hex: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/validateMobileOtp"))
            .json(&json!({ "txnId": txn_id, "otp": otp_sha256_hex }))
            .send()
            .await
            .context("OTP validation request failed")?;
        let token: TokenResponse = Self::expect_json(response, "validateMobileOtp").await?;
        Ok(token.token)
    }

    async fn beneficiaries(&self, credential: &Credential) -> Result<Vec<Beneficiary>> {
        let response = self
            .client
            .get(self.url("/appointment/beneficiaries"))
            .bearer_auth(&credential.token)
            .send()
            .await
            .context("beneficiaries request failed")?;
        let list: BeneficiariesResponse = Self::expect_json(response, "beneficiaries").await?;
        Ok(list.beneficiaries)
    }

    async fn calendar(
        &self,
        query: &CalendarQuery,
        credential: &Credential,
    ) -> Result<Vec<Center>> {
        let request = match query {
            CalendarQuery::ByPin { pincode, date } => self
                .client
                .get(self.url("/appointment/sessions/calendarByPin"))
                .query(&[("pincode", pincode.to_string()), ("date", date.clone())]),
            CalendarQuery::ByDistrict { district_id, date } => self
                .client
                .get(self.url("/appointment/sessions/calendarByDistrict"))
                .query(&[
                    ("district_id", district_id.to_string()),
                    ("date", date.clone()),
                ]),
        };
        let response = request
            .bearer_auth(&credential.token)
            .send()
            .await
            .context("calendar request failed")?;
        let calendar: CalendarResponse = Self::expect_json(response, "calendar").await?;
        Ok(calendar.centers)
    }

    async fn schedule(
        &self,
        request: &ScheduleRequest,
        credential: &Credential,
    ) -> Result<ScheduleReply> {
        let response = self
            .client
            .post(self.url("/appointment/schedule"))
            .bearer_auth(&credential.token)
            .json(request)
            .send()
            .await
            .context("schedule request failed")?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("failed to read schedule response body")?;
        let body = serde_json::from_str(&body).unwrap_or(Value::Null);
        debug!(status, "schedule reply");
        Ok(ScheduleReply { status, body })
    }

    async fn recaptcha(&self, credential: &Credential) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/getRecaptcha"))
            .bearer_auth(&credential.token)
            .json(&json!({}))
            .send()
            .await
            .context("captcha request failed")?;
        let captcha: CaptchaResponse = Self::expect_json(response, "getRecaptcha").await?;
        // The SVG arrives with json-escaped slashes.
        Ok(captcha.captcha.replace("\\/", "/"))
    }
}
