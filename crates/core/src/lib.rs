pub mod config;
pub mod ids;
pub mod tenant;

pub use config::Config;
pub use ids::*;
pub use tenant::{PendingSubject, TenantConfig};
