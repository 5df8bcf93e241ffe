use std::time::Duration;

use anyhow::Result;
use chrono::{Datelike, Local, Utc};
use tracing::info;

use cwn_api::{
    CowinApi, DEFAULT_BASE_URL, DEFAULT_DISTRICT_ID, DEFAULT_OTP_SECRET, HttpApi, ScheduleRequest,
};
use cwn_config::{UserConfig, parse_start_time, validate_mobile};
use cwn_core::AppError;
use cwn_core::types::{AgeTier, Beneficiary, Credential, SearchCriteria};
use cwn_scheduler::{
    AuthFlow, BookingStage, BookingVerdict, CaptchaSource, LaunchGate, Operator, SearchStage,
    Supervisor,
};

use crate::captcha::FileCaptcha;
use crate::cli::Cli;
use crate::terminal::TerminalOperator;

/// Gate -> auth -> supervised search -> supervised booking, strictly in
/// that order. A later phase never starts before the former fully
/// resolves.
pub async fn run(cli: Cli) -> Result<()> {
    let config = UserConfig::load(&cli.config)?;
    let mut criteria = config.criteria();
    apply_overrides(&mut criteria, &cli);
    let operator = TerminalOperator::new();

    let mobile = match cli.mobile.or_else(|| config.mobile.clone()) {
        Some(mobile) => mobile,
        None => operator.prompt("Enter mobile number:").await?,
    };
    validate_mobile(&mobile)?;

    let start_value = match cli.start_time.or_else(|| config.start_time.clone()) {
        Some(value) => value,
        None => {
            operator
                .prompt("Enter start time in HH:MM:SS 24 hour format:")
                .await?
        }
    };
    let start_at = parse_start_time(&start_value)?;

    if criteria.district_id.is_none()
        && criteria.pincodes.len() != 1
        && !operator
            .confirm(&format!(
                "No district configured. Proceed with Mumbai ({DEFAULT_DISTRICT_ID})?"
            ))
            .await?
    {
        return Err(AppError::Declined.into());
    }

    let api = HttpApi::new(
        config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
        config.otp_secret.as_deref().unwrap_or(DEFAULT_OTP_SECRET),
    )?;

    // Phase one of the gate runs before any network call so that a bad
    // start time fails the run immediately.
    let gate = LaunchGate::new(Duration::from_secs(config.otp_buffer_secs));
    gate.coarse_wait(start_at).await?;

    let auth = AuthFlow::new(&api, &operator, mobile);
    let mut credential = auth.authenticate().await?;

    let beneficiaries = api.beneficiaries(&credential).await?;
    let eligible = eligible_beneficiaries(&beneficiaries, criteria.age_tier, Local::now().year());
    if eligible.is_empty() {
        return Err(AppError::NoEligibleBeneficiaries.into());
    }
    println!("Eligible beneficiaries:");
    for beneficiary in &eligible {
        println!("  {} ({})", beneficiary.name, beneficiary.reference_id);
    }
    if !operator
        .confirm("The listed beneficiaries will be scheduled for vaccination. Continue?")
        .await?
    {
        return Err(AppError::Declined.into());
    }
    let beneficiary_ids: Vec<String> = eligible
        .iter()
        .map(|beneficiary| beneficiary.reference_id.clone())
        .collect();

    let captcha_source = FileCaptcha::new(&operator, std::env::current_dir()?);
    let mut captcha_text = captcha_source.transcribe(&api, &credential).await?;

    gate.spin_to(start_at).await;
    println!("Ready to rock and roll");

    let supervisor = Supervisor::new(&api, &operator, &auth);
    loop {
        let previous_token = credential.token.clone();
        let (selected, current) = supervisor
            .supervise(SearchStage::new(&criteria), credential)
            .await?;
        credential = current;
        captcha_text = ensure_captcha_current(
            &api,
            &captcha_source,
            &previous_token,
            &credential,
            captcha_text,
        )
        .await?;
        info!(
            center_id = selected.center_id,
            slot = %selected.slot,
            "session selected"
        );

        let request = ScheduleRequest {
            dose: criteria.dose.as_number(),
            captcha: captcha_text.clone(),
            center_id: selected.center_id,
            session_id: selected.session_id.clone(),
            beneficiaries: beneficiary_ids.clone(),
            slot: selected.slot.clone(),
        };
        let previous_token = credential.token.clone();
        let (verdict, current) = supervisor
            .supervise(BookingStage::new(request, &captcha_source), credential)
            .await?;
        credential = current;
        captcha_text = ensure_captcha_current(
            &api,
            &captcha_source,
            &previous_token,
            &credential,
            captcha_text,
        )
        .await?;

        match verdict {
            BookingVerdict::Confirmed(confirmation) => {
                println!("Successfully booked!\nAppointment confirmation number: {confirmation}");
                return Ok(());
            }
            BookingVerdict::Rejected => {
                println!("The slot was taken before the booking committed.");
                let (current, text) = after_rejection(
                    &api,
                    &operator,
                    &auth,
                    &captcha_source,
                    credential,
                    captcha_text,
                )
                .await?;
                credential = current;
                captcha_text = text;
            }
        }
    }
}

fn apply_overrides(criteria: &mut SearchCriteria, cli: &Cli) {
    if let Some(dose) = cli.dose {
        criteria.dose = dose;
    }
    if let Some(fee) = cli.fee {
        criteria.fee = fee;
    }
    if let Some(age_tier) = cli.age_tier {
        criteria.age_tier = age_tier;
    }
    if let Some(vaccine) = &cli.vaccine {
        criteria.vaccine = Some(vaccine.clone());
    }
    if let Some(district_id) = cli.district_id {
        criteria.district_id = Some(district_id);
    }
}

/// A credential swap anywhere in a supervised stage invalidates the captcha
/// transcription tied to the old token; compare tokens and re-transcribe on
/// mismatch.
async fn ensure_captcha_current(
    api: &dyn CowinApi,
    captcha: &dyn CaptchaSource,
    previous_token: &str,
    credential: &Credential,
    current: String,
) -> Result<String> {
    if credential.token == previous_token {
        return Ok(current);
    }
    captcha.transcribe(api, credential).await
}

/// After a hard rejection the lost slot is never re-attempted: the operator
/// is asked to search again, and a token that went stale in the meantime
/// gets a fresh handshake plus captcha before the next search.
async fn after_rejection(
    api: &dyn CowinApi,
    operator: &dyn Operator,
    auth: &AuthFlow<'_>,
    captcha: &dyn CaptchaSource,
    credential: Credential,
    captcha_text: String,
) -> Result<(Credential, String)> {
    if !operator.confirm("Search again?").await? {
        return Err(AppError::Declined.into());
    }
    if credential.is_expired(Utc::now()) {
        let credential = auth.authenticate().await?;
        let captcha_text = captcha.transcribe(api, &credential).await?;
        return Ok((credential, captcha_text));
    }
    Ok((credential, captcha_text))
}

fn eligible_beneficiaries(
    beneficiaries: &[Beneficiary],
    tier: AgeTier,
    current_year: i32,
) -> Vec<&Beneficiary> {
    beneficiaries
        .iter()
        .filter(|beneficiary| beneficiary.is_eligible(tier, current_year))
        .collect()
}
