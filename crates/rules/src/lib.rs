//! Pure compliance rules: exemption, grace arithmetic, and the
//! reminder/removal escalation decision. No I/O — callers execute the
//! returned intents and persist the resulting state.

pub mod escalation;
pub mod policy;

pub use escalation::{evaluate, next_action, Intent, NextAction};
pub use policy::{effective_grace_hours, is_exempt};
