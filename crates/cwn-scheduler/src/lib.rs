//! The timing and retry state machine around the CoWIN API.
//!
//! Phases run strictly in sequence: launch gate, authentication, supervised
//! availability search, supervised booking. Exactly one network call or
//! operator prompt is ever pending; both are plain await points of the same
//! single-threaded flow.

pub mod auth;
pub mod booking;
pub mod delay;
pub mod filter;
pub mod gate;
pub mod operator;
pub mod search;
pub mod supervise;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::AuthFlow;
pub use booking::{BookingLoop, BookingStage, BookingVerdict};
pub use gate::LaunchGate;
pub use operator::{CaptchaSource, Operator};
pub use search::{SearchLoop, SearchStage};
pub use supervise::{Stage, StageStatus, Supervisor};
