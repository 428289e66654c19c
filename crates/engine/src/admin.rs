//! Read-only administrative queries: pending report and statistics.

use chrono::{DateTime, Utc};

use introguard_core::{SubjectId, TenantId};

use crate::engine::{Engine, EngineError};
use crate::traits::PlatformError;

/// One row of the pending report.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub subject: SubjectId,
    pub display_name: Option<String>,
    /// Hours until removal eligibility (0 when already eligible).
    pub hours_left: f64,
    /// (threshold hours, sent) in ascending threshold order.
    pub reminders: Vec<(u32, bool)>,
}

/// Counts for the statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantStats {
    pub pending: usize,
    pub introduced_present: usize,
    pub total_members: usize,
    pub untracked: usize,
}

impl Engine {
    /// Remaining time and reminder status for every pending subject.
    pub async fn pending_report(
        &mut self,
        tenant: TenantId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingEntry>, EngineError> {
        let snapshot: Vec<(SubjectId, _)> = self
            .store
            .pending(tenant)?
            .iter()
            .map(|(id, rec)| (*id, rec.clone()))
            .collect();

        let mut report = Vec::with_capacity(snapshot.len());
        for (subject, record) in snapshot {
            let (display_name, is_booster) =
                match self.platform.resolve_subject(tenant, subject).await {
                    Ok(live) => (Some(live.display_name), live.is_booster),
                    Err(PlatformError::NotFound) => (None, false),
                    Err(e) => return Err(e.into()),
                };
            let grace = self.grace_for(&record, is_booster);
            let hours_left = (grace as f64 - record.hours_elapsed(now)).max(0.0);
            report.push(PendingEntry {
                subject,
                display_name,
                hours_left,
                reminders: record
                    .reminders_sent
                    .iter()
                    .map(|(&t, &sent)| (t, sent))
                    .collect(),
            });
        }
        Ok(report)
    }

    /// Statistics snapshot: pending / introduced-and-present / total /
    /// untracked (present, never introduced, not pending).
    pub async fn stats(&mut self, tenant: TenantId) -> Result<TenantStats, EngineError> {
        let members = self.platform.list_subjects(tenant).await?;
        let introduced = self.store.introduced(tenant)?.clone();
        let pending = self.store.pending(tenant)?;

        let mut stats = TenantStats {
            pending: pending.len(),
            ..Default::default()
        };
        for member in members.iter().filter(|m| !m.is_bot) {
            stats.total_members += 1;
            if introduced.contains(&member.id) {
                stats.introduced_present += 1;
            } else if !pending.contains_key(&member.id) {
                stats.untracked += 1;
            }
        }
        Ok(stats)
    }
}
