//! Cross-entity pattern aggregation and recommendation synthesis.
//!
//! Everything here is a pure function of its inputs: no I/O, no clock reads,
//! no randomness. Callers load the signal window and pass `now` explicitly.

pub mod aggregate;
pub mod recommend;
pub mod types;

pub use aggregate::{compute_insights, is_strategic, AggregationSettings};
pub use recommend::{playbook, recommend, Playbook, MAX_RECOMMENDATIONS};
pub use types::{Evidence, Pattern, PatternInsights, Priority, Recommendation};
