//! Admission policies applied before a story reaches the scorer

pub mod challenge;
pub mod rate_limit;

pub use challenge::{Challenge, ChallengeGate, Operator};
pub use rate_limit::RateLimiter;
