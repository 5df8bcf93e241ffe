use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Bearer token plus the expiry instant decoded from its `exp` claim.
///
/// Owned by the auth flow; every other component gets a shared reference.
/// Re-authentication produces a fresh `Credential` — the old one is never
/// mutated in place.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Remaining lifetime at `now`. Zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Fee-type constraint on a vaccination center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeeFilter {
    Free,
    Paid,
    #[default]
    Any,
}

impl FeeFilter {
    pub fn matches(&self, fee_type: &str) -> bool {
        match self {
            Self::Free => fee_type == "Free",
            Self::Paid => fee_type == "Paid",
            Self::Any => true,
        }
    }
}

/// Age eligibility bucket. Sessions advertise a minimum age limit of exactly
/// 18 or 45; the filter demands an exact match, no partial overlaps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgeTier {
    #[value(name = "under45")]
    Under45,
    #[value(name = "forty-five-plus")]
    FortyFivePlus,
    #[default]
    Any,
}

impl AgeTier {
    pub fn matches(&self, min_age_limit: u32) -> bool {
        match self {
            Self::Under45 => min_age_limit == 18,
            Self::FortyFivePlus => min_age_limit == 45,
            Self::Any => true,
        }
    }
}

/// Which dose the booking targets. Changes both the capacity field consulted
/// and the schedule request body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Dose {
    #[default]
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

impl Dose {
    pub fn as_number(&self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Immutable search preferences, constructed once at startup and passed
/// explicitly to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Empty means unconstrained; exactly one switches the calendar query
    /// from district addressing to pincode addressing.
    pub pincodes: Vec<u32>,
    pub district_id: Option<u32>,
    pub fee: FeeFilter,
    /// `None` accepts any vaccine.
    pub vaccine: Option<String>,
    pub age_tier: AgeTier,
    pub dose: Dose,
}

/// One vaccination session at a center, as returned by the calendar endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub vaccine: String,
    pub min_age_limit: u32,
    #[serde(default)]
    pub available_capacity_dose1: u32,
    #[serde(default)]
    pub available_capacity_dose2: u32,
    #[serde(default)]
    pub slots: Vec<String>,
}

impl Session {
    pub fn capacity_for(&self, dose: Dose) -> u32 {
        match dose {
            Dose::One => self.available_capacity_dose1,
            Dose::Two => self.available_capacity_dose2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Center {
    pub center_id: u64,
    #[serde(default)]
    pub name: String,
    pub pincode: u32,
    #[serde(default)]
    pub fee_type: String,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Outcome of a successful availability search. Immutable once produced;
/// `slot` is the first entry of the winning session's slot list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSlot {
    pub center_id: u64,
    pub session_id: String,
    pub slot: String,
}

/// Terminal classification of a bounded booking-attempt loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Reservation committed; carries the confirmation number.
    Confirmed(String),
    /// Hard 409 rejection — the slot is gone, do not re-attempt it.
    Rejected,
    /// The attempt window or the token expired without a verdict.
    Inconclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    #[serde(rename = "beneficiary_reference_id")]
    pub reference_id: String,
    pub name: String,
    pub birth_year: String,
    pub vaccination_status: String,
}

impl Beneficiary {
    /// Not-yet-vaccinated and inside the configured age tier.
    /// Age is approximated as `current_year - birth_year`.
    pub fn is_eligible(&self, tier: AgeTier, current_year: i32) -> bool {
        if self.vaccination_status != "Not Vaccinated" {
            return false;
        }
        let Ok(birth_year) = self.birth_year.parse::<i32>() else {
            return false;
        };
        let age = current_year - birth_year;
        match tier {
            AgeTier::Under45 => age < 45,
            AgeTier::FortyFivePlus => age >= 45,
            AgeTier::Any => true,
        }
    }
}
