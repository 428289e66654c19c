//! Opaque platform identifiers shared across the workspace.
//!
//! All ids are platform snowflakes; `0` is the conventional "unset" value
//! for channel and role references in tenant configuration.

/// One independent community/server instance.
pub type TenantId = u64;

/// An individual whose compliance is tracked within a tenant.
pub type SubjectId = u64;

/// An opaque external channel reference (0 = unset/disabled).
pub type ChannelRef = u64;

/// An opaque external role reference (0 = unset/disabled).
pub type RoleRef = u64;

/// Sentinel for "no channel/role configured".
pub const UNSET: u64 = 0;
