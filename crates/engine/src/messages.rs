//! Notice text sent to subjects and tenant log channels.

use introguard_core::ChannelRef;

fn channel_mention(channel: ChannelRef) -> String {
    format!("<#{channel}>")
}

/// Welcome notice sent when tracking starts on join.
pub fn welcome(intro_channel: ChannelRef, grace_hours: u32) -> String {
    format!(
        "Welcome! Please introduce yourself in {} within {} hours to avoid being removed.",
        channel_mention(intro_channel),
        grace_hours,
    )
}

/// Reminder notice; the final configured threshold gets last-warning wording.
pub fn reminder(intro_channel: ChannelRef, hours_left: u32, is_final: bool) -> String {
    if is_final {
        format!(
            "**Final reminder:** you have **{} hours** remaining to introduce yourself in {}. \
             This is your last warning before being removed.",
            hours_left,
            channel_mention(intro_channel),
        )
    } else {
        format!(
            "**Reminder:** you have **{} hours** remaining to introduce yourself in {}. \
             Please post your introduction to avoid being removed.",
            hours_left,
            channel_mention(intro_channel),
        )
    }
}

/// Final notice sent best-effort just before removal.
pub fn removal(intro_channel: ChannelRef, grace_hours: u32) -> String {
    format!(
        "You have been removed for not posting an introduction in {} within {} hours.",
        channel_mention(intro_channel),
        grace_hours,
    )
}

/// Audit reason attached to the removal itself.
pub fn removal_reason(grace_hours: u32) -> String {
    format!("did not post introduction within {grace_hours} hours")
}

/// Notice sent to existing subjects picked up by backfill tracking.
pub fn backfill(intro_channel: ChannelRef, grace_hours: u32) -> String {
    format!(
        "All members are now required to post an introduction in {}. \
         You have **{} hours** to introduce yourself or you will be removed.",
        channel_mention(intro_channel),
        grace_hours,
    )
}

/// Author notice after a rejected introduction, naming the deficiency.
pub fn rejection(deficiency: &str) -> String {
    format!("Your introduction was removed: {deficiency}. Please post it again.")
}
