//! Platform trait definition and shared error types.
//!
//! The engine's only window onto the chat platform. Every outbound side
//! effect (notices, removals, role grants, history scans) goes through
//! this seam so the escalation logic stays testable without a live
//! connection.

use async_trait::async_trait;

use introguard_core::{ChannelRef, RoleRef, SubjectId, TenantId};

/// A message reference for deletion/acknowledgement.
pub type MessageRef = u64;

/// Errors a platform call can surface to the engine.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The recipient blocks direct notices. Logged, non-fatal.
    #[error("delivery denied by recipient")]
    DeliveryDenied,

    /// The platform refused a removal or role grant.
    #[error("authorization denied")]
    AuthorizationDenied,

    /// The subject (or channel/message) no longer exists.
    #[error("not found")]
    NotFound,

    /// Transport-level failure; the subject is retried next cycle.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// A live subject record as the platform currently sees it.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: SubjectId,
    pub display_name: String,
    pub roles: Vec<RoleRef>,
    pub is_booster: bool,
    pub is_bot: bool,
}

/// One author entry from a channel history scan.
#[derive(Debug, Clone, Copy)]
pub struct HistoryAuthor {
    pub author: SubjectId,
    pub is_bot: bool,
}

/// Trait for chat-platform implementations.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Deliver a direct notice to a subject.
    async fn send_direct_notice(&self, subject: SubjectId, text: &str)
        -> Result<(), PlatformError>;

    /// Remove a subject from a tenant, with an audit reason.
    async fn remove_subject(
        &self,
        tenant: TenantId,
        subject: SubjectId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Grant a role to a subject.
    async fn grant_role(
        &self,
        tenant: TenantId,
        subject: SubjectId,
        role: RoleRef,
    ) -> Result<(), PlatformError>;

    /// Resolve a subject's current roles and boosting flag.
    async fn resolve_subject(
        &self,
        tenant: TenantId,
        subject: SubjectId,
    ) -> Result<Subject, PlatformError>;

    /// Scan up to `limit` messages of a channel's history, newest first.
    /// Finite and restartable.
    async fn scan_channel_history(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        limit: usize,
    ) -> Result<Vec<HistoryAuthor>, PlatformError>;

    /// Post a line to a tenant log channel.
    async fn post_log(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        text: &str,
    ) -> Result<(), PlatformError>;

    /// Request deletion of a message (failed intro validation).
    async fn delete_message(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), PlatformError>;

    /// Annotate a message as an accepted introduction.
    async fn acknowledge_message(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), PlatformError>;

    /// All current non-departed subjects of a tenant.
    async fn list_subjects(&self, tenant: TenantId) -> Result<Vec<Subject>, PlatformError>;

    /// Tenants this process is responsible for.
    async fn list_tenants(&self) -> Result<Vec<TenantId>, PlatformError>;
}
