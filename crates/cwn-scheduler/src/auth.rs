use anyhow::Result;
use sha2::{Digest, Sha256};
use tracing::info;

use cwn_api::{CowinApi, decode_token_expiry};
use cwn_core::AppError;
use cwn_core::types::Credential;

use crate::operator::Operator;

/// OTP challenge/response handshake. Every call produces a fresh
/// [`Credential`]; there is no incremental refresh, re-authentication is
/// simply another full run.
pub struct AuthFlow<'a> {
    api: &'a dyn CowinApi,
    operator: &'a dyn Operator,
    mobile: String,
}

impl<'a> AuthFlow<'a> {
    pub fn new(api: &'a dyn CowinApi, operator: &'a dyn Operator, mobile: impl Into<String>) -> Self {
        Self {
            api,
            operator,
            mobile: mobile.into(),
        }
    }

    pub async fn authenticate(&self) -> Result<Credential> {
        let txn_id = self
            .api
            .generate_otp(&self.mobile)
            .await
            .map_err(|err| AppError::Auth(format!("OTP request rejected: {err:#}")))?;
        info!("OTP request sent");

        let otp = self.operator.prompt("Enter OTP:").await?;
        let token = self
            .api
            .validate_otp(&txn_id, &sha256_hex(otp.trim()))
            .await
            .map_err(|err| AppError::Auth(format!("OTP validation rejected: {err:#}")))?;

        let expires_at = decode_token_expiry(&token)
            .map_err(|err| AppError::Auth(format!("unusable token: {err:#}")))?;
        info!(%expires_at, "authenticated");
        Ok(Credential { token, expires_at })
    }
}

/// The OTP is submitted as its SHA-256 hex digest, never in the clear.
fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
