//! Log-only platform: every side effect becomes a tracing line.
//!
//! Stands in for a real chat adapter in the worker binary and during
//! dry runs: notices, removals, and role grants succeed without doing
//! anything. Subject resolution reports `Unavailable` so the sweep
//! leaves pending state untouched instead of untracking everyone.

use async_trait::async_trait;
use tracing::info;

use introguard_core::{ChannelRef, RoleRef, SubjectId, TenantId};

use crate::traits::{HistoryAuthor, MessageRef, Platform, PlatformError, Subject};

/// Platform implementation that only logs.
#[derive(Debug, Default)]
pub struct ConsolePlatform;

#[async_trait]
impl Platform for ConsolePlatform {
    async fn send_direct_notice(
        &self,
        subject: SubjectId,
        text: &str,
    ) -> Result<(), PlatformError> {
        info!(subject, text, "console: direct notice");
        Ok(())
    }

    async fn remove_subject(
        &self,
        tenant: TenantId,
        subject: SubjectId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        info!(tenant, subject, reason, "console: remove subject");
        Ok(())
    }

    async fn grant_role(
        &self,
        tenant: TenantId,
        subject: SubjectId,
        role: RoleRef,
    ) -> Result<(), PlatformError> {
        info!(tenant, subject, role, "console: grant role");
        Ok(())
    }

    async fn resolve_subject(
        &self,
        _tenant: TenantId,
        _subject: SubjectId,
    ) -> Result<Subject, PlatformError> {
        Err(PlatformError::Unavailable(
            "console platform cannot resolve subjects".into(),
        ))
    }

    async fn scan_channel_history(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        limit: usize,
    ) -> Result<Vec<HistoryAuthor>, PlatformError> {
        info!(tenant, channel, limit, "console: history scan (empty)");
        Ok(Vec::new())
    }

    async fn post_log(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        text: &str,
    ) -> Result<(), PlatformError> {
        info!(tenant, channel, text, "console: mod-log");
        Ok(())
    }

    async fn delete_message(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), PlatformError> {
        info!(tenant, channel, message, "console: delete message");
        Ok(())
    }

    async fn acknowledge_message(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), PlatformError> {
        info!(tenant, channel, message, "console: acknowledge message");
        Ok(())
    }

    async fn list_subjects(&self, _tenant: TenantId) -> Result<Vec<Subject>, PlatformError> {
        Ok(Vec::new())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>, PlatformError> {
        Ok(Vec::new())
    }
}
