//! User configuration: who to book for, where to look, and when to start.
//!
//! Loaded once from a TOML file at startup and converted into an immutable
//! [`SearchCriteria`] that is passed explicitly to every component. Values
//! the file leaves out (mobile number, start time) are prompted for
//! interactively by the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use cwn_core::AppError;
use cwn_core::types::{AgeTier, Dose, FeeFilter, SearchCriteria};

/// Seconds before the start instant at which the OTP request and captcha
/// transcription happen, so the token still covers the launch moment.
pub const DEFAULT_OTP_BUFFER_SECS: u64 = 300;

fn default_dose() -> u8 {
    1
}

fn default_otp_buffer() -> u64 {
    DEFAULT_OTP_BUFFER_SECS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// 10-digit mobile number the OTP is delivered to. Prompted if absent.
    pub mobile: Option<String>,
    /// Local `HH:MM:SS` at which slots are released. Prompted if absent.
    pub start_time: Option<String>,
    #[serde(default = "default_dose")]
    pub dose: u8,
    #[serde(default)]
    pub pincodes: Vec<u32>,
    pub district_id: Option<u32>,
    #[serde(default)]
    pub fee: FeeFilter,
    pub vaccine: Option<String>,
    #[serde(default)]
    pub age_tier: AgeTier,
    #[serde(default = "default_otp_buffer")]
    pub otp_buffer_secs: u64,
    /// Override for the API host, mainly for testing.
    pub base_url: Option<String>,
    /// Override for the OTP request secret, in case the remote web client
    /// rotates it.
    pub otp_secret: Option<String>,
}

impl UserConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        debug!(path = %path.display(), "loaded user config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=2).contains(&self.dose) {
            return Err(AppError::Config(format!("dose must be 1 or 2, got {}", self.dose)).into());
        }
        if let Some(mobile) = &self.mobile {
            validate_mobile(mobile)?;
        }
        if let Some(start_time) = &self.start_time {
            parse_start_time(start_time)?;
        }
        Ok(())
    }

    pub fn dose(&self) -> Dose {
        match self.dose {
            2 => Dose::Two,
            _ => Dose::One,
        }
    }

    pub fn criteria(&self) -> SearchCriteria {
        SearchCriteria {
            pincodes: self.pincodes.clone(),
            district_id: self.district_id,
            fee: self.fee,
            vaccine: self.vaccine.clone(),
            age_tier: self.age_tier,
            dose: self.dose(),
        }
    }
}

pub fn validate_mobile(mobile: &str) -> Result<()> {
    if mobile.len() != 10 || !mobile.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Config(format!("mobile must be 10 digits, got '{mobile}'")).into());
    }
    Ok(())
}

/// Parse a local `HH:MM:SS` start time as today's date, returning the UTC
/// instant. Whether that instant is still in the future is the launch
/// gate's concern, not ours.
pub fn parse_start_time(value: &str) -> Result<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M:%S").map_err(|_| {
        AppError::Config(format!("start_time must be HH:MM:SS (24 hour), got '{value}'"))
    })?;
    let local = Local::now().date_naive().and_time(time);
    let instant = Local
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| AppError::Config(format!("ambiguous local start time '{value}'")))?;
    Ok(instant.with_timezone(&Utc))
}
