use std::collections::{BTreeSet, HashMap};

use sat_core::sat_common::ChannelId;

/// Registry of random access slots this terminal has already claimed on the
/// return link, keyed by superframe id and allocation channel.
///
/// Distinctness only covers this terminal's own picks. Collisions with other
/// terminals are a receiver-side concern and are not tracked here.
pub struct SlotTracker {
    used: HashMap<(u64, ChannelId), BTreeSet<u16>>,
}

impl SlotTracker {
    pub fn new() -> Self {
        Self {
            used: HashMap::new(),
        }
    }

    /// True iff the slot has not been claimed for this (superframe, channel).
    pub fn is_slot_available(&self, superframe_id: u64, channel_id: ChannelId, slot_id: u16) -> bool {
        self.used
            .get(&(superframe_id, channel_id))
            .is_none_or(|slots| !slots.contains(&slot_id))
    }

    /// Claims a slot. Returns false when it was already claimed.
    pub fn mark_slot_used(&mut self, superframe_id: u64, channel_id: ChannelId, slot_id: u16) -> bool {
        self.used
            .entry((superframe_id, channel_id))
            .or_default()
            .insert(slot_id)
    }

    /// Drops every entry belonging to a superframe before the current one.
    pub fn prune_stale(&mut self, current_superframe_id: u64) {
        let before = self.used.len();
        self.used.retain(|(superframe_id, _), _| *superframe_id >= current_superframe_id);
        let removed = before - self.used.len();
        if removed > 0 {
            tracing::debug!("prune_stale: dropped {} stale (superframe, channel) entries before superframe {}", removed, current_superframe_id);
        }
    }

    /// Number of claimed slots for one (superframe, channel).
    pub fn used_count(&self, superframe_id: u64, channel_id: ChannelId) -> usize {
        self.used
            .get(&(superframe_id, channel_id))
            .map_or(0, |slots| slots.len())
    }

    pub fn log_used_slots(&self) {
        for ((superframe_id, channel_id), slots) in &self.used {
            tracing::trace!("used slots sf {} ch {}: {:?}", superframe_id, channel_id, slots);
        }
    }
}

impl Default for SlotTracker {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_claims_succeed_duplicate_fails() {
        let mut tracker = SlotTracker::new();
        assert!(tracker.mark_slot_used(1, 0, 5));
        assert!(tracker.mark_slot_used(1, 0, 6));
        assert!(tracker.mark_slot_used(1, 1, 5));
        assert!(tracker.mark_slot_used(2, 0, 5));

        assert!(!tracker.mark_slot_used(1, 0, 5));
        assert!(!tracker.is_slot_available(1, 0, 5));
        assert!(tracker.is_slot_available(1, 0, 7));
    }

    #[test]
    fn prune_drops_past_and_keeps_current_and_future() {
        let mut tracker = SlotTracker::new();
        tracker.mark_slot_used(1, 0, 1);
        tracker.mark_slot_used(2, 0, 2);
        tracker.mark_slot_used(5, 0, 3);
        tracker.mark_slot_used(6, 1, 4);

        tracker.prune_stale(5);

        assert_eq!(tracker.used_count(1, 0), 0);
        assert_eq!(tracker.used_count(2, 0), 0);
        assert_eq!(tracker.used_count(5, 0), 1);
        assert_eq!(tracker.used_count(6, 1), 1);
        // Pruned slots become claimable again for their key
        assert!(tracker.is_slot_available(1, 0, 1));
    }

    #[test]
    fn channels_are_independent() {
        let mut tracker = SlotTracker::new();
        assert!(tracker.mark_slot_used(3, 0, 9));
        assert!(tracker.is_slot_available(3, 1, 9));
        assert!(tracker.mark_slot_used(3, 1, 9));
        assert_eq!(tracker.used_count(3, 0), 1);
        assert_eq!(tracker.used_count(3, 1), 1);
    }
}
