//! Varia Scheduler - ordering of format combinations.
//!
//! Switching the account-level format is the most expensive step of a run,
//! so passes are ordered such that consecutive formats differ in exactly one
//! dimension and the currently active format comes first.

pub mod scheduler;

pub use scheduler::{ordered_values, reflected_product, FormatScheduler};
