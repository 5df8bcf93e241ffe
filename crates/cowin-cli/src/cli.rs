use std::path::PathBuf;

use clap::Parser;

use cwn_core::types::{AgeTier, Dose, FeeFilter};

/// Books a CoWIN vaccination slot the moment a release window opens.
///
/// Requires a human twice per token: once to transcribe the OTP, once for
/// the captcha. Search preferences come from the config file; the flags
/// below override individual values for one run.
#[derive(Parser, Debug)]
#[command(name = "cowin", version, about)]
pub struct Cli {
    /// Path to the user config file.
    #[arg(short, long, default_value = "cowin.toml")]
    pub config: PathBuf,

    /// Mobile number the OTP is delivered to (overrides the config file).
    #[arg(long)]
    pub mobile: Option<String>,

    /// Local HH:MM:SS at which slots are released (overrides the config
    /// file).
    #[arg(long)]
    pub start_time: Option<String>,

    /// Dose to book (overrides the config file).
    #[arg(long, value_enum)]
    pub dose: Option<Dose>,

    /// Fee constraint on centers (overrides the config file).
    #[arg(long, value_enum)]
    pub fee: Option<FeeFilter>,

    /// Age tier to filter sessions by (overrides the config file).
    #[arg(long, value_enum)]
    pub age_tier: Option<AgeTier>,

    /// Vaccine name to insist on (overrides the config file).
    #[arg(long)]
    pub vaccine: Option<String>,

    /// District id for the calendar query (overrides the config file).
    #[arg(long)]
    pub district_id: Option<u32>,
}
