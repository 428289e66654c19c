//! The [`Engine`] aggregate: event-driven state transitions (joins,
//! candidate introductions) and administrator overrides, all funneled
//! through the tenant store and the platform seam.
//!
//! Handlers are plain methods so every transition is unit-testable
//! without a platform connection; callers running on the event loop get
//! the serialization guarantees described in the store docs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use introguard_core::config::PolicyConfig;
use introguard_core::{ChannelRef, PendingSubject, RoleRef, SubjectId, TenantConfig, TenantId};
use introguard_rules::{is_exempt, policy};
use introguard_store::{StoreError, TenantStore};

use crate::messages;
use crate::traits::{MessageRef, Platform, PlatformError, Subject};

/// History scan depth for cache rebuilds.
pub const REBUILD_SCAN_LIMIT: usize = 10_000;

/// Bounds for backfill grace periods (1 hour to 1 week).
pub const BACKFILL_GRACE_RANGE: std::ops::RangeInclusive<u32> = 1..=168;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("intro channel not configured for tenant {0}")]
    NoIntroChannel(TenantId),

    #[error("grace period must be between 1 and 168 hours, got {0}")]
    GraceOutOfBounds(u32),
}

/// A candidate introduction message as delivered by the platform.
#[derive(Debug, Clone)]
pub struct IntroMessage {
    pub id: MessageRef,
    pub channel: ChannelRef,
    pub author: SubjectId,
    pub author_is_bot: bool,
    pub content: String,
}

/// What the intro handler did with a candidate message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntroOutcome {
    /// Not an introduction we care about (bot author, wrong channel).
    Ignored,
    /// Failed content validation; deletion requested, author notified.
    Rejected(String),
    /// Qualifying introduction; subject is now introduced.
    Accepted,
}

/// Summary of a cache rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildSummary {
    pub scanned: usize,
    pub introduced_total: usize,
    pub unpended: usize,
}

/// Summary of a cleanup pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupSummary {
    pub pending_purged: usize,
    pub introduced_purged: usize,
}

/// Per-tenant compliance engine: owns the store, calls out through the
/// platform, never shares mutable state across suspension points.
pub struct Engine {
    pub(crate) store: TenantStore,
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) policy: PolicyConfig,
}

impl Engine {
    pub fn new(store: TenantStore, platform: Arc<dyn Platform>, policy: PolicyConfig) -> Self {
        Self {
            store,
            platform,
            policy,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Tenants with stored state (see [`TenantStore::known_tenants`]).
    pub fn known_tenants(&self) -> Vec<TenantId> {
        self.store.known_tenants()
    }

    /// Post to the tenant's mod-log channel when one is configured.
    /// Log-channel failures are logged locally and swallowed.
    pub(crate) async fn post_mod_log(&self, tenant: TenantId, config: &TenantConfig, text: &str) {
        if let Some(channel) = config.mod_log_channel() {
            if let Err(e) = self.platform.post_log(tenant, channel, text).await {
                warn!(tenant, error = %e, "failed to post mod-log message");
            }
        }
    }

    // ── Event-driven transitions ────────────────────────────────────

    /// A subject joined the tenant. Returns whether tracking started.
    pub async fn on_join(
        &mut self,
        tenant: TenantId,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        if subject.is_bot {
            return Ok(false);
        }

        let config = self.store.config(tenant)?.clone();
        if is_exempt(&subject.roles, &config.exempt_role_refs) {
            info!(tenant, subject = subject.id, "exempt by role, not tracking");
            return Ok(false);
        }

        // An introduction outlives membership: leaving and rejoining never
        // puts a subject back on the clock. A subject id is in at most one
        // of pending/introduced.
        if self.store.introduced(tenant)?.contains(&subject.id) {
            info!(tenant, subject = subject.id, "already introduced, not tracking");
            return Ok(false);
        }

        self.store.pending_mut(tenant)?.insert(
            subject.id,
            PendingSubject::new(now, &self.policy.reminder_thresholds),
        );
        self.store.save_pending(tenant)?;
        info!(tenant, subject = subject.id, "tracking new subject");

        if let Some(intro_channel) = config.intro_channel() {
            let text = messages::welcome(intro_channel, self.policy.grace_period_hours);
            if let Err(e) = self.platform.send_direct_notice(subject.id, &text).await {
                warn!(tenant, subject = subject.id, error = %e, "welcome notice undeliverable");
            }
        }
        Ok(true)
    }

    /// A message arrived in some channel; treat it as a candidate
    /// introduction when it is in the tenant's intro channel.
    pub async fn on_intro_message(
        &mut self,
        tenant: TenantId,
        msg: &IntroMessage,
    ) -> Result<IntroOutcome, EngineError> {
        if msg.author_is_bot {
            return Ok(IntroOutcome::Ignored);
        }
        let config = self.store.config(tenant)?.clone();
        if config.intro_channel() != Some(msg.channel) {
            return Ok(IntroOutcome::Ignored);
        }

        if let Some(deficiency) = self.validate_intro(&msg.content) {
            if let Err(e) = self.platform.delete_message(tenant, msg.channel, msg.id).await {
                warn!(tenant, message = msg.id, error = %e, "could not delete rejected intro");
            }
            let text = messages::rejection(&deficiency);
            if let Err(e) = self.platform.send_direct_notice(msg.author, &text).await {
                warn!(tenant, subject = msg.author, error = %e, "rejection notice undeliverable");
            }
            info!(tenant, subject = msg.author, %deficiency, "introduction rejected");
            return Ok(IntroOutcome::Rejected(deficiency));
        }

        self.admit(tenant, &config, msg.author).await?;
        if let Err(e) = self
            .platform
            .acknowledge_message(tenant, msg.channel, msg.id)
            .await
        {
            warn!(tenant, message = msg.id, error = %e, "could not acknowledge intro");
        }
        info!(tenant, subject = msg.author, "introduction accepted");
        Ok(IntroOutcome::Accepted)
    }

    /// Content validation: minimum length and required keywords, both
    /// optional. Returns the specific deficiency on failure.
    fn validate_intro(&self, content: &str) -> Option<String> {
        if let Some(min) = self.policy.min_intro_length {
            let len = content.chars().count() as u32;
            if len < min {
                return Some(format!(
                    "introductions must be at least {min} characters (yours was {len})"
                ));
            }
        }
        let lowered = content.to_lowercase();
        for keyword in &self.policy.required_keywords {
            if !lowered.contains(keyword.as_str()) {
                return Some(format!("introductions must mention \"{keyword}\""));
            }
        }
        None
    }

    /// Terminal transition to introduced: add to the introduced set,
    /// drop from pending, grant the welcome role, persist both records.
    async fn admit(
        &mut self,
        tenant: TenantId,
        config: &TenantConfig,
        subject: SubjectId,
    ) -> Result<(), EngineError> {
        let newly = self.store.introduced_mut(tenant)?.insert(subject);
        let was_pending = self.store.pending_mut(tenant)?.remove(&subject).is_some();
        if newly {
            self.store.save_introduced(tenant)?;
        }
        if was_pending {
            self.store.save_pending(tenant)?;
        }

        if let Some(role) = config.welcome_role() {
            if let Err(e) = self.platform.grant_role(tenant, subject, role).await {
                warn!(tenant, subject, role, error = %e, "could not grant welcome role");
                self.post_mod_log(
                    tenant,
                    config,
                    &format!("could not grant welcome role to <@{subject}>: {e}"),
                )
                .await;
            }
        }
        Ok(())
    }

    // ── Administrator overrides ─────────────────────────────────────

    /// Mark a subject introduced without content validation.
    /// Returns whether the subject was newly added to the introduced set.
    pub async fn mark_introduced(
        &mut self,
        tenant: TenantId,
        subject: SubjectId,
    ) -> Result<bool, EngineError> {
        let config = self.store.config(tenant)?.clone();
        let newly = !self.store.introduced(tenant)?.contains(&subject);
        self.admit(tenant, &config, subject).await?;
        info!(tenant, subject, "marked introduced by administrator");
        Ok(newly)
    }

    /// Stop tracking a subject without marking them introduced.
    /// No removal action is ever taken again unless they are re-tracked.
    pub fn untrack(&mut self, tenant: TenantId, subject: SubjectId) -> Result<bool, EngineError> {
        let removed = self.store.pending_mut(tenant)?.remove(&subject).is_some();
        if removed {
            self.store.save_pending(tenant)?;
            info!(tenant, subject, "untracked by administrator");
        }
        Ok(removed)
    }

    /// Start tracking every existing subject that is neither introduced
    /// nor pending nor exempt, with an explicit custom grace period.
    /// Returns how many subjects were added.
    pub async fn backfill_track(
        &mut self,
        tenant: TenantId,
        custom_grace_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, EngineError> {
        if !BACKFILL_GRACE_RANGE.contains(&custom_grace_hours) {
            return Err(EngineError::GraceOutOfBounds(custom_grace_hours));
        }
        let config = self.store.config(tenant)?.clone();
        let intro_channel = config
            .intro_channel()
            .ok_or(EngineError::NoIntroChannel(tenant))?;

        let members = self.platform.list_subjects(tenant).await?;
        let mut added = Vec::new();
        for member in &members {
            if member.is_bot || is_exempt(&member.roles, &config.exempt_role_refs) {
                continue;
            }
            if self.store.introduced(tenant)?.contains(&member.id)
                || self.store.pending(tenant)?.contains_key(&member.id)
            {
                continue;
            }
            let mut record = PendingSubject::new(now, &self.policy.reminder_thresholds);
            record.grace_period_override_hours = Some(custom_grace_hours);
            self.store.pending_mut(tenant)?.insert(member.id, record);
            added.push(member.id);
        }
        self.store.save_pending(tenant)?;

        let text = messages::backfill(intro_channel, custom_grace_hours);
        for subject in &added {
            if let Err(e) = self.platform.send_direct_notice(*subject, &text).await {
                warn!(tenant, subject, error = %e, "backfill notice undeliverable");
            }
        }
        info!(tenant, added = added.len(), custom_grace_hours, "backfill tracking complete");
        Ok(added.len())
    }

    /// Rebuild the introduced set from the authoritative channel history,
    /// then reconcile pending: anyone the scan proves introduced stops
    /// being tracked.
    pub async fn rebuild_introduced_cache(
        &mut self,
        tenant: TenantId,
    ) -> Result<RebuildSummary, EngineError> {
        let config = self.store.config(tenant)?.clone();
        let channel = config
            .intro_channel()
            .ok_or(EngineError::NoIntroChannel(tenant))?;

        let history = self
            .platform
            .scan_channel_history(tenant, channel, REBUILD_SCAN_LIMIT)
            .await?;

        let introduced = self.store.introduced_mut(tenant)?;
        introduced.clear();
        for entry in &history {
            if !entry.is_bot {
                introduced.insert(entry.author);
            }
        }
        let introduced: std::collections::BTreeSet<_> = introduced.clone();

        let pending = self.store.pending_mut(tenant)?;
        let before = pending.len();
        pending.retain(|id, _| !introduced.contains(id));
        let unpended = before - pending.len();

        self.store.save_introduced(tenant)?;
        self.store.save_pending(tenant)?;

        let summary = RebuildSummary {
            scanned: history.len(),
            introduced_total: introduced.len(),
            unpended,
        };
        info!(
            tenant,
            scanned = summary.scanned,
            introduced = summary.introduced_total,
            unpended = summary.unpended,
            "introduced cache rebuilt"
        );
        Ok(summary)
    }

    /// Purge subjects no longer present in the tenant from both the
    /// pending collection and the introduced set.
    pub async fn cleanup(&mut self, tenant: TenantId) -> Result<CleanupSummary, EngineError> {
        let present: std::collections::BTreeSet<SubjectId> = self
            .platform
            .list_subjects(tenant)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let pending = self.store.pending_mut(tenant)?;
        let pending_before = pending.len();
        pending.retain(|id, _| present.contains(id));
        let pending_purged = pending_before - pending.len();

        let introduced = self.store.introduced_mut(tenant)?;
        let introduced_before = introduced.len();
        introduced.retain(|id| present.contains(id));
        let introduced_purged = introduced_before - introduced.len();

        if pending_purged > 0 {
            self.store.save_pending(tenant)?;
        }
        if introduced_purged > 0 {
            self.store.save_introduced(tenant)?;
        }
        info!(tenant, pending_purged, introduced_purged, "cleanup complete");
        Ok(CleanupSummary {
            pending_purged,
            introduced_purged,
        })
    }

    // ── Tenant configuration ────────────────────────────────────────

    pub fn set_intro_channel(
        &mut self,
        tenant: TenantId,
        channel: ChannelRef,
    ) -> Result<(), EngineError> {
        let mut config = self.store.config(tenant)?.clone();
        config.intro_channel_ref = channel;
        self.store.save_config(tenant, config)?;
        Ok(())
    }

    pub fn set_log_channel(
        &mut self,
        tenant: TenantId,
        channel: ChannelRef,
    ) -> Result<(), EngineError> {
        let mut config = self.store.config(tenant)?.clone();
        config.mod_log_channel_ref = channel;
        self.store.save_config(tenant, config)?;
        Ok(())
    }

    pub fn set_welcome_role(
        &mut self,
        tenant: TenantId,
        role: RoleRef,
    ) -> Result<(), EngineError> {
        let mut config = self.store.config(tenant)?.clone();
        config.welcome_role_ref = role;
        self.store.save_config(tenant, config)?;
        Ok(())
    }

    /// Resolve the effective grace period for one pending record.
    pub(crate) fn grace_for(&self, record: &PendingSubject, is_booster: bool) -> u32 {
        policy::effective_grace_hours(
            self.policy.grace_period_hours,
            self.policy.booster_bonus_hours,
            is_booster,
            record.grace_period_override_hours,
        )
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::testutil::{member, MockPlatform};
    use crate::traits::HistoryAuthor;

    use super::*;

    const TENANT: TenantId = 1;
    const INTRO: ChannelRef = 500;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
    }

    fn harness(policy: PolicyConfig) -> (TempDir, Arc<MockPlatform>, Engine) {
        let tmp = TempDir::new().unwrap();
        let store = TenantStore::open(tmp.path()).unwrap();
        let platform = Arc::new(MockPlatform::new(vec![TENANT]));
        let mut engine = Engine::new(store, platform.clone(), policy);
        engine.set_intro_channel(TENANT, INTRO).unwrap();
        (tmp, platform, engine)
    }

    fn default_harness() -> (TempDir, Arc<MockPlatform>, Engine) {
        harness(PolicyConfig::default())
    }

    fn intro_msg(author: SubjectId, content: &str) -> IntroMessage {
        IntroMessage {
            id: 9000 + author,
            channel: INTRO,
            author,
            author_is_bot: false,
            content: content.to_string(),
        }
    }

    // -- on_join -----------------------------------------------------

    #[tokio::test]
    async fn join_starts_tracking_and_welcomes() {
        let (_tmp, platform, mut engine) = default_harness();
        let tracked = engine.on_join(TENANT, &member(10), t0()).await.unwrap();
        assert!(tracked);

        let pending = engine.store.pending(TENANT).unwrap();
        assert_eq!(pending[&10].join_time, t0());
        assert!(!pending[&10].reminder_sent(24));

        let notices = platform.notices_to(10);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("<#500>"));
        assert!(notices[0].contains("72 hours"));
    }

    #[tokio::test]
    async fn exempt_subject_never_enters_pending() {
        let (_tmp, platform, mut engine) = default_harness();
        let mut config = engine.store.config(TENANT).unwrap().clone();
        config.exempt_role_refs.insert(77);
        engine.store.save_config(TENANT, config).unwrap();

        let mut vip = member(11);
        vip.roles = vec![77];
        let tracked = engine.on_join(TENANT, &vip, t0()).await.unwrap();

        assert!(!tracked);
        assert!(engine.store.pending(TENANT).unwrap().is_empty());
        assert!(platform.notices_to(11).is_empty());
    }

    #[tokio::test]
    async fn bots_are_ignored_on_join() {
        let (_tmp, _platform, mut engine) = default_harness();
        let mut bot = member(12);
        bot.is_bot = true;
        assert!(!engine.on_join(TENANT, &bot, t0()).await.unwrap());
        assert!(engine.store.pending(TENANT).unwrap().is_empty());
    }

    #[tokio::test]
    async fn introduced_subject_rejoining_is_not_retracked() {
        let (_tmp, platform, mut engine) = default_harness();
        engine.on_join(TENANT, &member(90), t0()).await.unwrap();
        engine
            .on_intro_message(TENANT, &intro_msg(90, "Hello, I am subject ninety"))
            .await
            .unwrap();

        // Leave and rejoin: the introduction still counts.
        let tracked = engine.on_join(TENANT, &member(90), t0()).await.unwrap();
        assert!(!tracked);
        assert!(!engine.store.pending(TENANT).unwrap().contains_key(&90));
        assert!(engine.store.introduced(TENANT).unwrap().contains(&90));
        // No second welcome notice either.
        assert_eq!(platform.notices_to(90).len(), 1);
    }

    #[tokio::test]
    async fn delivery_denied_welcome_still_tracks() {
        let (_tmp, platform, mut engine) = default_harness();
        platform.deny_notices_to.lock().unwrap().push(13);
        assert!(engine.on_join(TENANT, &member(13), t0()).await.unwrap());
        assert!(engine.store.pending(TENANT).unwrap().contains_key(&13));
    }

    // -- on_intro_message --------------------------------------------

    #[tokio::test]
    async fn valid_intro_moves_subject_to_introduced() {
        let (_tmp, platform, mut engine) = default_harness();
        engine.set_welcome_role(TENANT, 42).unwrap();
        engine.on_join(TENANT, &member(20), t0()).await.unwrap();

        let outcome = engine
            .on_intro_message(TENANT, &intro_msg(20, "Hi, I am subject twenty!"))
            .await
            .unwrap();

        assert_eq!(outcome, IntroOutcome::Accepted);
        assert!(!engine.store.pending(TENANT).unwrap().contains_key(&20));
        assert!(engine.store.introduced(TENANT).unwrap().contains(&20));

        let observed = platform.observed.lock().unwrap();
        assert_eq!(observed.role_grants, vec![(TENANT, 20, 42)]);
        assert_eq!(observed.acknowledged, vec![9020]);
    }

    #[tokio::test]
    async fn intro_outside_intro_channel_is_ignored() {
        let (_tmp, _platform, mut engine) = default_harness();
        engine.on_join(TENANT, &member(21), t0()).await.unwrap();

        let mut msg = intro_msg(21, "hello everyone");
        msg.channel = INTRO + 1;
        let outcome = engine.on_intro_message(TENANT, &msg).await.unwrap();

        assert_eq!(outcome, IntroOutcome::Ignored);
        assert!(engine.store.pending(TENANT).unwrap().contains_key(&21));
    }

    #[tokio::test]
    async fn too_short_intro_is_rejected_without_state_change() {
        let policy = PolicyConfig {
            min_intro_length: Some(20),
            ..Default::default()
        };
        let (_tmp, platform, mut engine) = harness(policy);
        engine.on_join(TENANT, &member(22), t0()).await.unwrap();

        let outcome = engine
            .on_intro_message(TENANT, &intro_msg(22, "hi"))
            .await
            .unwrap();

        assert!(matches!(outcome, IntroOutcome::Rejected(_)));
        assert!(engine.store.pending(TENANT).unwrap().contains_key(&22));
        assert!(!engine.store.introduced(TENANT).unwrap().contains(&22));

        let observed = platform.observed.lock().unwrap();
        assert_eq!(observed.deleted, vec![9022]);
        // Author was told what was wrong.
        assert!(observed.notices.iter().any(|(id, text)| {
            *id == 22 && text.contains("at least 20 characters")
        }));
    }

    #[tokio::test]
    async fn missing_keyword_is_named_in_rejection() {
        let policy = PolicyConfig {
            required_keywords: vec!["hobby".to_string()],
            ..Default::default()
        };
        let (_tmp, _platform, mut engine) = harness(policy);

        let outcome = engine
            .on_intro_message(TENANT, &intro_msg(23, "A long enough intro without the word"))
            .await
            .unwrap();
        match outcome {
            IntroOutcome::Rejected(deficiency) => assert!(deficiency.contains("hobby")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bot_messages_in_intro_channel_are_ignored() {
        let (_tmp, _platform, mut engine) = default_harness();
        let mut msg = intro_msg(24, "beep boop");
        msg.author_is_bot = true;
        assert_eq!(
            engine.on_intro_message(TENANT, &msg).await.unwrap(),
            IntroOutcome::Ignored
        );
        assert!(engine.store.introduced(TENANT).unwrap().is_empty());
    }

    // -- administrator overrides -------------------------------------

    #[tokio::test]
    async fn mark_introduced_skips_validation() {
        let policy = PolicyConfig {
            min_intro_length: Some(1000),
            ..Default::default()
        };
        let (_tmp, _platform, mut engine) = harness(policy);
        engine.on_join(TENANT, &member(30), t0()).await.unwrap();

        assert!(engine.mark_introduced(TENANT, 30).await.unwrap());
        assert!(!engine.store.pending(TENANT).unwrap().contains_key(&30));
        assert!(engine.store.introduced(TENANT).unwrap().contains(&30));

        // Second call is idempotent.
        assert!(!engine.mark_introduced(TENANT, 30).await.unwrap());
    }

    #[tokio::test]
    async fn untrack_leaves_introduced_set_alone() {
        let (_tmp, _platform, mut engine) = default_harness();
        engine.on_join(TENANT, &member(31), t0()).await.unwrap();
        engine.store.introduced_mut(TENANT).unwrap().insert(99);

        assert!(engine.untrack(TENANT, 31).unwrap());
        assert!(!engine.untrack(TENANT, 31).unwrap());
        assert!(engine.store.pending(TENANT).unwrap().is_empty());
        assert!(engine.store.introduced(TENANT).unwrap().contains(&99));
    }

    // -- backfill ----------------------------------------------------

    #[tokio::test]
    async fn backfill_tracks_only_unknown_subjects_with_override() {
        let (_tmp, platform, mut engine) = default_harness();
        platform.add_member(TENANT, member(40)); // untracked
        platform.add_member(TENANT, member(41)); // already introduced
        platform.add_member(TENANT, member(42)); // already pending
        let mut bot = member(43);
        bot.is_bot = true;
        platform.add_member(TENANT, bot);

        engine.store.introduced_mut(TENANT).unwrap().insert(41);
        engine.on_join(TENANT, &member(42), t0()).await.unwrap();

        let added = engine.backfill_track(TENANT, 72, t0()).await.unwrap();
        assert_eq!(added, 1);

        let record = engine.store.pending(TENANT).unwrap()[&40].clone();
        assert_eq!(record.join_time, t0());
        assert_eq!(record.grace_period_override_hours, Some(72));
        // Scenario E: override beats booster bonus.
        assert_eq!(engine.grace_for(&record, true), 72);

        assert!(platform.notices_to(40).iter().any(|t| t.contains("72 hours")));
    }

    #[tokio::test]
    async fn backfill_grace_bounds_are_enforced() {
        let (_tmp, _platform, mut engine) = default_harness();
        assert!(matches!(
            engine.backfill_track(TENANT, 0, t0()).await,
            Err(EngineError::GraceOutOfBounds(0))
        ));
        assert!(matches!(
            engine.backfill_track(TENANT, 169, t0()).await,
            Err(EngineError::GraceOutOfBounds(169))
        ));
    }

    // -- cache rebuild and cleanup -----------------------------------

    #[tokio::test]
    async fn rebuild_replays_history_and_reconciles_pending() {
        let (_tmp, platform, mut engine) = default_harness();
        // Stale entry that the authoritative scan will not confirm.
        engine.store.introduced_mut(TENANT).unwrap().insert(999);
        engine.on_join(TENANT, &member(50), t0()).await.unwrap();
        engine.on_join(TENANT, &member(51), t0()).await.unwrap();

        *platform.history.lock().unwrap() = vec![
            HistoryAuthor { author: 50, is_bot: false },
            HistoryAuthor { author: 60, is_bot: false },
            HistoryAuthor { author: 7, is_bot: true },
        ];

        let summary = engine.rebuild_introduced_cache(TENANT).await.unwrap();
        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.introduced_total, 2);
        assert_eq!(summary.unpended, 1);

        let introduced = engine.store.introduced(TENANT).unwrap();
        assert!(introduced.contains(&50) && introduced.contains(&60));
        assert!(!introduced.contains(&999));
        assert!(!introduced.contains(&7));

        let pending = engine.store.pending(TENANT).unwrap();
        assert!(!pending.contains_key(&50));
        assert!(pending.contains_key(&51));
    }

    #[tokio::test]
    async fn rebuild_requires_intro_channel() {
        let tmp = TempDir::new().unwrap();
        let store = TenantStore::open(tmp.path()).unwrap();
        let platform = Arc::new(MockPlatform::new(vec![TENANT]));
        let mut engine = Engine::new(store, platform, PolicyConfig::default());
        assert!(matches!(
            engine.rebuild_introduced_cache(TENANT).await,
            Err(EngineError::NoIntroChannel(TENANT))
        ));
    }

    #[tokio::test]
    async fn cleanup_purges_departed_subjects() {
        let (_tmp, platform, mut engine) = default_harness();
        platform.add_member(TENANT, member(70));
        engine.on_join(TENANT, &member(70), t0()).await.unwrap();
        engine.on_join(TENANT, &member(71), t0()).await.unwrap(); // departed
        engine.store.introduced_mut(TENANT).unwrap().insert(70);
        engine.store.introduced_mut(TENANT).unwrap().insert(72); // departed

        let summary = engine.cleanup(TENANT).await.unwrap();
        assert_eq!(summary.pending_purged, 1);
        assert_eq!(summary.introduced_purged, 1);
        assert!(engine.store.pending(TENANT).unwrap().contains_key(&70));
        assert!(engine.store.introduced(TENANT).unwrap().contains(&70));
    }

    // -- tenant configuration ----------------------------------------

    #[tokio::test]
    async fn config_changes_survive_restart() {
        let tmp = TempDir::new().unwrap();
        {
            let store = TenantStore::open(tmp.path()).unwrap();
            let platform = Arc::new(MockPlatform::new(vec![TENANT]));
            let mut engine = Engine::new(store, platform, PolicyConfig::default());
            engine.set_intro_channel(TENANT, 111).unwrap();
            engine.set_log_channel(TENANT, 222).unwrap();
            engine.set_welcome_role(TENANT, 333).unwrap();
        }
        let mut store = TenantStore::open(tmp.path()).unwrap();
        let config = store.config(TENANT).unwrap();
        assert_eq!(config.intro_channel(), Some(111));
        assert_eq!(config.mod_log_channel(), Some(222));
        assert_eq!(config.welcome_role(), Some(333));
    }
}
