//! Shared test fixture: a scriptable in-memory platform.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use introguard_core::{ChannelRef, RoleRef, SubjectId, TenantId};

use crate::traits::{HistoryAuthor, MessageRef, Platform, PlatformError, Subject};

/// Everything the mock observed, for assertions.
#[derive(Debug, Default)]
pub struct Observed {
    pub notices: Vec<(SubjectId, String)>,
    pub removals: Vec<(TenantId, SubjectId, String)>,
    pub role_grants: Vec<(TenantId, SubjectId, RoleRef)>,
    pub mod_logs: Vec<(TenantId, ChannelRef, String)>,
    pub deleted: Vec<MessageRef>,
    pub acknowledged: Vec<MessageRef>,
}

/// Scriptable platform: membership is a map, failures are switches.
#[derive(Default)]
pub struct MockPlatform {
    pub members: Mutex<HashMap<(TenantId, SubjectId), Subject>>,
    pub history: Mutex<Vec<HistoryAuthor>>,
    pub tenants: Vec<TenantId>,
    pub deny_notices_to: Mutex<Vec<SubjectId>>,
    pub deny_removals: bool,
    pub deny_role_grants: bool,
    pub unavailable_subjects: Mutex<Vec<SubjectId>>,
    pub observed: Mutex<Observed>,
}

impl MockPlatform {
    pub fn new(tenants: Vec<TenantId>) -> Self {
        Self {
            tenants,
            ..Default::default()
        }
    }

    pub fn add_member(&self, tenant: TenantId, subject: Subject) {
        self.members
            .lock()
            .unwrap()
            .insert((tenant, subject.id), subject);
    }

    pub fn remove_member(&self, tenant: TenantId, subject: SubjectId) {
        self.members.lock().unwrap().remove(&(tenant, subject));
    }

    pub fn notices_to(&self, subject: SubjectId) -> Vec<String> {
        self.observed
            .lock()
            .unwrap()
            .notices
            .iter()
            .filter(|(id, _)| *id == subject)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

/// Plain non-bot member with no roles.
pub fn member(id: SubjectId) -> Subject {
    Subject {
        id,
        display_name: format!("subject-{id}"),
        roles: Vec::new(),
        is_booster: false,
        is_bot: false,
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn send_direct_notice(
        &self,
        subject: SubjectId,
        text: &str,
    ) -> Result<(), PlatformError> {
        if self.deny_notices_to.lock().unwrap().contains(&subject) {
            return Err(PlatformError::DeliveryDenied);
        }
        self.observed
            .lock()
            .unwrap()
            .notices
            .push((subject, text.to_string()));
        Ok(())
    }

    async fn remove_subject(
        &self,
        tenant: TenantId,
        subject: SubjectId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        if self.deny_removals {
            return Err(PlatformError::AuthorizationDenied);
        }
        self.members.lock().unwrap().remove(&(tenant, subject));
        self.observed
            .lock()
            .unwrap()
            .removals
            .push((tenant, subject, reason.to_string()));
        Ok(())
    }

    async fn grant_role(
        &self,
        tenant: TenantId,
        subject: SubjectId,
        role: RoleRef,
    ) -> Result<(), PlatformError> {
        if self.deny_role_grants {
            return Err(PlatformError::AuthorizationDenied);
        }
        self.observed
            .lock()
            .unwrap()
            .role_grants
            .push((tenant, subject, role));
        Ok(())
    }

    async fn resolve_subject(
        &self,
        tenant: TenantId,
        subject: SubjectId,
    ) -> Result<Subject, PlatformError> {
        if self.unavailable_subjects.lock().unwrap().contains(&subject) {
            return Err(PlatformError::Unavailable("scripted outage".into()));
        }
        self.members
            .lock()
            .unwrap()
            .get(&(tenant, subject))
            .cloned()
            .ok_or(PlatformError::NotFound)
    }

    async fn scan_channel_history(
        &self,
        _tenant: TenantId,
        _channel: ChannelRef,
        limit: usize,
    ) -> Result<Vec<HistoryAuthor>, PlatformError> {
        let history = self.history.lock().unwrap();
        Ok(history.iter().take(limit).copied().collect())
    }

    async fn post_log(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        text: &str,
    ) -> Result<(), PlatformError> {
        self.observed
            .lock()
            .unwrap()
            .mod_logs
            .push((tenant, channel, text.to_string()));
        Ok(())
    }

    async fn delete_message(
        &self,
        _tenant: TenantId,
        _channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), PlatformError> {
        self.observed.lock().unwrap().deleted.push(message);
        Ok(())
    }

    async fn acknowledge_message(
        &self,
        _tenant: TenantId,
        _channel: ChannelRef,
        message: MessageRef,
    ) -> Result<(), PlatformError> {
        self.observed.lock().unwrap().acknowledged.push(message);
        Ok(())
    }

    async fn list_subjects(&self, tenant: TenantId) -> Result<Vec<Subject>, PlatformError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|((t, _), _)| *t == tenant)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>, PlatformError> {
        Ok(self.tenants.clone())
    }
}
