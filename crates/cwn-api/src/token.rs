use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// Extract the expiry instant from a JWT's `exp` claim.
///
/// The signature is deliberately not verified: the token was just handed to
/// us by the issuer and we only need to know when it stops working.
pub fn decode_token_expiry(token: &str) -> Result<DateTime<Utc>> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => bail!("token is not a three-part JWT"),
    };
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .context("token payload is not valid base64url")?;
    let claims: Claims =
        serde_json::from_slice(&decoded).context("token payload missing 'exp' claim")?;
    Utc.timestamp_opt(claims.exp, 0)
        .single()
        .with_context(|| format!("token 'exp' claim out of range: {}", claims.exp))
}
