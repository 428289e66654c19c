//! Per-tenant domain types: configuration wiring and tracked subjects.
//!
//! These are the shapes persisted by `introguard-store`; field names are
//! fixed by the on-disk record format (camelCase JSON).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelRef, RoleRef, UNSET};

/// Per-tenant channel/role wiring. Mutated only by administrator
/// operations; persisted immediately on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantConfig {
    /// Channel where introductions are expected (0 = unset).
    pub intro_channel_ref: ChannelRef,
    /// Channel receiving moderation log messages (0 = disabled).
    pub mod_log_channel_ref: ChannelRef,
    /// Role granted after a qualifying introduction (0 = disabled).
    pub welcome_role_ref: RoleRef,
    /// Subjects holding any of these roles are never tracked.
    pub exempt_role_refs: BTreeSet<RoleRef>,
}

impl TenantConfig {
    pub fn intro_channel(&self) -> Option<ChannelRef> {
        (self.intro_channel_ref != UNSET).then_some(self.intro_channel_ref)
    }

    pub fn mod_log_channel(&self) -> Option<ChannelRef> {
        (self.mod_log_channel_ref != UNSET).then_some(self.mod_log_channel_ref)
    }

    pub fn welcome_role(&self) -> Option<RoleRef> {
        (self.welcome_role_ref != UNSET).then_some(self.welcome_role_ref)
    }
}

/// One tracked subject awaiting an introduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubject {
    /// When tracking started (UTC).
    pub join_time: DateTime<Utc>,
    /// Per-subject grace override set by backfill tracking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_override_hours: Option<u32>,
    /// Threshold-hours → whether that reminder was sent (or superseded).
    pub reminders_sent: BTreeMap<u32, bool>,
}

impl PendingSubject {
    /// Start tracking at `join_time` with every configured threshold unsent.
    pub fn new(join_time: DateTime<Utc>, thresholds: &[u32]) -> Self {
        Self {
            join_time,
            grace_period_override_hours: None,
            reminders_sent: thresholds.iter().map(|&t| (t, false)).collect(),
        }
    }

    /// Lazily add unsent entries for thresholds configured after tracking
    /// began. Existing entries are never touched.
    pub fn ensure_thresholds(&mut self, thresholds: &[u32]) {
        for &t in thresholds {
            self.reminders_sent.entry(t).or_insert(false);
        }
    }

    pub fn reminder_sent(&self, threshold: u32) -> bool {
        self.reminders_sent.get(&threshold).copied().unwrap_or(false)
    }

    pub fn mark_sent(&mut self, threshold: u32) {
        self.reminders_sent.insert(threshold, true);
    }

    /// Hours elapsed since tracking started, with fractional precision.
    pub fn hours_elapsed(&self, now: DateTime<Utc>) -> f64 {
        now.signed_duration_since(self.join_time).num_seconds() as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_subject_has_all_thresholds_unsent() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let s = PendingSubject::new(t0, &[24, 48]);
        assert_eq!(s.reminders_sent.len(), 2);
        assert!(!s.reminder_sent(24));
        assert!(!s.reminder_sent(48));
    }

    #[test]
    fn ensure_thresholds_preserves_sent_flags() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut s = PendingSubject::new(t0, &[24]);
        s.mark_sent(24);
        s.ensure_thresholds(&[12, 24, 48]);
        assert!(s.reminder_sent(24));
        assert!(!s.reminder_sent(12));
        assert!(!s.reminder_sent(48));
    }

    #[test]
    fn config_round_trips_camel_case() {
        let mut cfg = TenantConfig::default();
        cfg.intro_channel_ref = 42;
        cfg.exempt_role_refs.insert(7);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("introChannelRef"));
        assert!(json.contains("exemptRoleRefs"));
        let back: TenantConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
