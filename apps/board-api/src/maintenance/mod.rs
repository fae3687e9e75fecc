//! Periodic maintenance: the monthly recruiter usage reset.

pub mod schedule;
pub mod scheduler;
pub mod usage_reset;
