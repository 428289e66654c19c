//! Escalation state machine for one tracked subject.
//!
//! A subject moves through `tracked → reminded(k) → removed` purely as a
//! function of wall-clock time and its reminder history. [`next_action`]
//! applies the collapse-to-latest rule so that arbitrarily long gaps
//! between evaluations (downtime, slow sweeps) produce exactly one
//! reminder — the most urgent one still due — instead of a backlog.
//!
//! Safety gating (removal disabled, dry-run) is deliberately NOT applied
//! here; the sweep decides what to do with an [`Intent`], so the decision
//! itself stays deterministic and configuration-independent.

use chrono::{DateTime, Utc};
use tracing::trace;

use introguard_core::PendingSubject;

/// The raw escalation decision for one subject at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Nothing due yet.
    None,
    /// Send the reminder for this threshold (hours after join).
    SendReminder(u32),
    /// Grace period elapsed; subject is eligible for removal.
    Remove,
}

/// A side-effect intent emitted by [`evaluate`]. The sweep executes it
/// through the platform interface and persists the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    NoOp,
    Notify {
        /// Which threshold fired.
        threshold_hours: u32,
        /// Whole hours remaining until removal eligibility.
        hours_left: u32,
        /// Whether this is the last configured reminder.
        is_final: bool,
    },
    Escalate {
        reason: String,
    },
}

/// Decide what to do for `subject` at `now`.
///
/// `thresholds` is the ascending, de-duplicated global reminder schedule;
/// entries for thresholds added after tracking began are lazily
/// initialized as unsent. When several thresholds are due at once, every
/// one except the latest is marked sent without a notification — its
/// window has passed and the subject gets the more urgent reminder
/// instead. At most one `SendReminder` is returned per call; the caller
/// marks that threshold sent after the delivery attempt.
pub fn next_action(
    now: DateTime<Utc>,
    subject: &mut PendingSubject,
    thresholds: &[u32],
    grace_hours: u32,
) -> NextAction {
    subject.ensure_thresholds(thresholds);
    let elapsed = subject.hours_elapsed(now);

    // Removal dominates: once the grace period has run out no reminder
    // matters, regardless of how many were sent.
    if elapsed >= grace_hours as f64 {
        return NextAction::Remove;
    }

    let due: Vec<u32> = thresholds
        .iter()
        .copied()
        .filter(|&t| elapsed >= t as f64 && !subject.reminder_sent(t))
        .collect();

    match due.split_last() {
        None => NextAction::None,
        Some((&latest, superseded)) => {
            for &t in superseded {
                trace!(threshold = t, latest, "reminder superseded, collapsing");
                subject.mark_sent(t);
            }
            NextAction::SendReminder(latest)
        }
    }
}

/// Evaluate one subject and translate the decision into an [`Intent`].
///
/// Never fails; unreachable subjects are the sweep's concern.
pub fn evaluate(
    now: DateTime<Utc>,
    subject: &mut PendingSubject,
    thresholds: &[u32],
    grace_hours: u32,
) -> Intent {
    match next_action(now, subject, thresholds, grace_hours) {
        NextAction::None => Intent::NoOp,
        NextAction::SendReminder(t) => {
            let hours_left = (grace_hours as f64 - subject.hours_elapsed(now)).max(0.0);
            Intent::Notify {
                threshold_hours: t,
                hours_left: hours_left.round() as u32,
                is_final: thresholds.last() == Some(&t),
            }
        }
        NextAction::Remove => Intent::Escalate {
            reason: format!("no introduction posted within {grace_hours} hours"),
        },
    }
}

// ── Tests ───────────────────────────────────────────────────────────
