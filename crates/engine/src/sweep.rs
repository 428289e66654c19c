//! The periodic sweep: evaluate every pending subject of every tenant
//! against the escalation rules and execute the resulting intents.
//!
//! Iteration runs over a snapshot of each tenant's pending key set, then
//! re-fetches each record through the live cache, so handlers firing
//! during a suspension point (a join, an introduction) are picked up
//! next cycle instead of invalidating this one. A failure for one
//! subject never aborts the remaining subjects, and each tenant gets at
//! most one batched pending-record write per cycle.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use introguard_core::{SubjectId, TenantConfig, TenantId};
use introguard_rules::{evaluate, Intent};

use crate::engine::{Engine, EngineError};
use crate::messages;
use crate::traits::PlatformError;

/// Counters for one full sweep across all tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub tenants: usize,
    pub evaluated: usize,
    pub reminders: usize,
    pub removals: usize,
    pub suppressed: usize,
    pub untracked: usize,
    pub failures: usize,
}

impl Engine {
    /// Run one sweep at `now`. Per-tenant errors are logged and do not
    /// abort the remaining tenants.
    pub async fn run_sweep(&mut self, now: DateTime<Utc>) -> SweepSummary {
        let mut summary = SweepSummary::default();

        let mut tenants = match self.platform.list_tenants().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "could not list tenants from platform, using stored set");
                Vec::new()
            }
        };
        for id in self.store.known_tenants() {
            if !tenants.contains(&id) {
                tenants.push(id);
            }
        }

        for tenant in tenants {
            summary.tenants += 1;
            if let Err(e) = self.sweep_tenant(tenant, now, &mut summary).await {
                error!(tenant, error = %e, "tenant sweep failed");
                summary.failures += 1;
            }
        }

        info!(
            tenants = summary.tenants,
            evaluated = summary.evaluated,
            reminders = summary.reminders,
            removals = summary.removals,
            suppressed = summary.suppressed,
            untracked = summary.untracked,
            failures = summary.failures,
            "sweep complete"
        );
        summary
    }

    async fn sweep_tenant(
        &mut self,
        tenant: TenantId,
        now: DateTime<Utc>,
        summary: &mut SweepSummary,
    ) -> Result<(), EngineError> {
        let config = self.store.config(tenant)?.clone();

        // Snapshot of the key set; the live collection may gain or lose
        // entries while we await platform calls.
        let snapshot: Vec<SubjectId> = self.store.pending(tenant)?.keys().copied().collect();
        if snapshot.is_empty() {
            return Ok(());
        }
        debug!(tenant, subjects = snapshot.len(), "sweeping tenant");

        let mut dirty = false;
        for subject in snapshot {
            // Re-fetch: the subject may have introduced themselves (or been
            // untracked) since the snapshot was taken.
            let Some(record) = self.store.pending(tenant)?.get(&subject).cloned() else {
                continue;
            };
            summary.evaluated += 1;

            let live = match self.platform.resolve_subject(tenant, subject).await {
                Ok(s) => s,
                Err(PlatformError::NotFound) => {
                    // Left the tenant: normal terminal transition, no notice.
                    info!(tenant, subject, "subject departed, untracking");
                    self.store.pending_mut(tenant)?.remove(&subject);
                    summary.untracked += 1;
                    dirty = true;
                    continue;
                }
                Err(e) => {
                    warn!(tenant, subject, error = %e, "could not resolve subject, retrying next cycle");
                    summary.failures += 1;
                    continue;
                }
            };

            let grace_hours = self.grace_for(&record, live.is_booster);
            let mut updated = record.clone();
            let thresholds = self.policy.reminder_thresholds.clone();
            let intent = evaluate(now, &mut updated, &thresholds, grace_hours);

            match intent {
                Intent::NoOp => {}
                Intent::Notify {
                    threshold_hours,
                    hours_left,
                    is_final,
                } => {
                    let attempted = self
                        .deliver_reminder(
                            tenant,
                            &config,
                            subject,
                            threshold_hours,
                            hours_left,
                            is_final,
                        )
                        .await;
                    // Attempted counts as sent: one attempt per threshold,
                    // no resend storms after failures or restarts. With no
                    // intro channel there was no attempt, so the threshold
                    // stays due until one is configured.
                    if attempted {
                        updated.mark_sent(threshold_hours);
                        summary.reminders += 1;
                    }
                }
                Intent::Escalate { reason } => {
                    match self
                        .escalate(tenant, &config, subject, grace_hours, &reason)
                        .await
                    {
                        EscalateOutcome::Removed => {
                            self.store.pending_mut(tenant)?.remove(&subject);
                            summary.removals += 1;
                            dirty = true;
                            continue;
                        }
                        EscalateOutcome::Suppressed => summary.suppressed += 1,
                        EscalateOutcome::Failed => summary.failures += 1,
                    }
                }
            }

            if updated != record {
                // Write back through the live collection, but never
                // resurrect a subject a handler removed mid-cycle.
                if let Some(slot) = self.store.pending_mut(tenant)?.get_mut(&subject) {
                    *slot = updated;
                    dirty = true;
                }
            }
        }

        if dirty {
            self.store.save_pending(tenant)?;
        }
        Ok(())
    }

    /// Send one reminder notice, returning whether a delivery attempt was
    /// made. Delivery failure is logged and surfaced to the mod-log
    /// channel; it does not fail the sweep. A tenant with no intro channel
    /// has nothing to point the subject at, so no attempt is made.
    async fn deliver_reminder(
        &self,
        tenant: TenantId,
        config: &TenantConfig,
        subject: SubjectId,
        threshold_hours: u32,
        hours_left: u32,
        is_final: bool,
    ) -> bool {
        let Some(intro_channel) = config.intro_channel() else {
            warn!(tenant, subject, "reminder due but no intro channel configured");
            self.post_mod_log(
                tenant,
                config,
                &format!("reminder due for <@{subject}> but no intro channel is configured"),
            )
            .await;
            return false;
        };
        let text = messages::reminder(intro_channel, hours_left, is_final);
        match self.platform.send_direct_notice(subject, &text).await {
            Ok(()) => {
                info!(tenant, subject, threshold_hours, "reminder delivered");
            }
            Err(e) => {
                warn!(tenant, subject, threshold_hours, error = %e, "reminder undeliverable");
                self.post_mod_log(
                    tenant,
                    config,
                    &format!("reminder ({threshold_hours}h) to <@{subject}> undeliverable: {e}"),
                )
                .await;
            }
        }
        true
    }

    /// Execute (or suppress) a removal.
    async fn escalate(
        &self,
        tenant: TenantId,
        config: &TenantConfig,
        subject: SubjectId,
        grace_hours: u32,
        reason: &str,
    ) -> EscalateOutcome {
        // Safety gates: both convert the destructive intent into a
        // logged no-op without touching any other state.
        if !self.policy.removal_enabled {
            info!(tenant, subject, "removal disabled, would remove");
            self.post_mod_log(
                tenant,
                config,
                &format!("removal disabled: would remove <@{subject}> ({reason})"),
            )
            .await;
            return EscalateOutcome::Suppressed;
        }
        if self.policy.dry_run {
            info!(tenant, subject, "dry-run, would remove");
            self.post_mod_log(
                tenant,
                config,
                &format!("dry-run: would remove <@{subject}> ({reason})"),
            )
            .await;
            return EscalateOutcome::Suppressed;
        }

        // Best-effort final notice; a blocked recipient doesn't stop removal.
        if let Some(intro_channel) = config.intro_channel() {
            let text = messages::removal(intro_channel, grace_hours);
            if let Err(e) = self.platform.send_direct_notice(subject, &text).await {
                debug!(tenant, subject, error = %e, "final notice undeliverable");
            }
        }

        let audit = messages::removal_reason(grace_hours);
        match self.platform.remove_subject(tenant, subject, &audit).await {
            Ok(()) => {
                info!(tenant, subject, "subject removed");
                self.post_mod_log(tenant, config, &format!("removed <@{subject}>: {reason}"))
                    .await;
                EscalateOutcome::Removed
            }
            Err(e) => {
                // One attempt per cycle; stays pending until permissions
                // change or an administrator intervenes.
                warn!(tenant, subject, error = %e, "removal failed");
                self.post_mod_log(
                    tenant,
                    config,
                    &format!("could not remove <@{subject}>: {e}"),
                )
                .await;
                EscalateOutcome::Failed
            }
        }
    }
}

/// What happened to one `Escalate` intent.
enum EscalateOutcome {
    Removed,
    Suppressed,
    Failed,
}

// ── Tests ───────────────────────────────────────────────────────────
