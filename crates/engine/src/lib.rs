//! Tenant engine: ingestion handlers, the periodic sweep, and the
//! administrative surface, all driving [`introguard_store::TenantStore`]
//! and a pluggable [`Platform`] implementation.

pub mod admin;
pub mod console;
pub mod engine;
pub mod messages;
pub mod sweep;
pub mod traits;

#[cfg(test)]
mod testutil;

pub use admin::{PendingEntry, TenantStats};
pub use console::ConsolePlatform;
pub use engine::{CleanupSummary, Engine, EngineError, IntroMessage, IntroOutcome, RebuildSummary};
pub use sweep::SweepSummary;
pub use traits::{HistoryAuthor, MessageRef, Platform, PlatformError, Subject};
