//! HTTP boundary for the CoWIN public API.
//!
//! Everything the rest of the workspace needs goes through the [`CowinApi`]
//! trait so the timing loops can be exercised against in-memory fakes.

mod client;
mod token;

pub use client::{
    CalendarQuery, CowinApi, DEFAULT_BASE_URL, DEFAULT_OTP_SECRET, HttpApi, ScheduleReply,
    ScheduleRequest,
};
pub use token::decode_token_expiry;

/// District used when the config names neither a district nor a single
/// pincode (Mumbai).
pub const DEFAULT_DISTRICT_ID: u32 = 395;
