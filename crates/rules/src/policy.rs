//! Exemption and grace-period arithmetic.

use std::collections::BTreeSet;

use introguard_core::RoleRef;

/// A subject is exempt iff it holds any of the tenant's exempt roles.
pub fn is_exempt(subject_roles: &[RoleRef], exempt_roles: &BTreeSet<RoleRef>) -> bool {
    subject_roles.iter().any(|r| exempt_roles.contains(r))
}

/// Total hours a subject has before removal becomes eligible.
///
/// Precedence: a per-subject override (set by backfill tracking) wins
/// outright; otherwise boosting subjects get the configured bonus on top
/// of the base grace period.
pub fn effective_grace_hours(
    base_hours: u32,
    booster_bonus_hours: u32,
    is_booster: bool,
    per_subject_override: Option<u32>,
) -> u32 {
    if let Some(hours) = per_subject_override {
        return hours;
    }
    if is_booster && booster_bonus_hours > 0 {
        base_hours + booster_bonus_hours
    } else {
        base_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- is_exempt ---------------------------------------------------

    #[test]
    fn exempt_when_roles_intersect() {
        let exempt: BTreeSet<RoleRef> = [10, 20].into_iter().collect();
        assert!(is_exempt(&[5, 20], &exempt));
    }

    #[test]
    fn not_exempt_when_disjoint() {
        let exempt: BTreeSet<RoleRef> = [10, 20].into_iter().collect();
        assert!(!is_exempt(&[5, 6], &exempt));
        assert!(!is_exempt(&[], &exempt));
    }

    #[test]
    fn no_exempt_roles_configured_means_nobody_exempt() {
        assert!(!is_exempt(&[1, 2, 3], &BTreeSet::new()));
    }

    // -- effective_grace_hours ---------------------------------------

    #[test]
    fn booster_gets_bonus() {
        assert_eq!(effective_grace_hours(24, 12, true, None), 36);
    }

    #[test]
    fn non_booster_gets_base() {
        assert_eq!(effective_grace_hours(24, 12, false, None), 24);
    }

    #[test]
    fn override_wins_over_everything() {
        assert_eq!(effective_grace_hours(24, 12, true, Some(5)), 5);
        assert_eq!(effective_grace_hours(24, 0, false, Some(72)), 72);
    }

    #[test]
    fn zero_bonus_ignored_for_boosters() {
        assert_eq!(effective_grace_hours(24, 0, true, None), 24);
    }
}
