use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sat_config::AllocationChannelConfig;
use sat_core::sat_common::ChannelId;
use sat_core::SimTime;

use crate::mac::slot_tracker::SlotTracker;

/// Contention scheduler for the return-link random access schemes.
///
/// Owns the used-slot registry and all per-channel backoff state. Slot picks
/// hand back slot ids only, mapping them to transmit times is the caller's
/// business.
pub struct RandomAccess {
    channels: Vec<ChannelCtx>,
    slot_tracker: SlotTracker,
    rng: StdRng,
    /// Shared by all replicas of one CRDSA payload, incremented per payload.
    crdsa_unique_packet_id: u32,
    /// Guards against a queue event scheduling a second ESSA evaluation
    /// while one is already pending.
    essa_scheduled: bool,
}

struct ChannelCtx {
    conf: AllocationChannelConfig,
    crdsa_backoff_release: SimTime,
    fsim_backoff_release: SimTime,
    consecutive_blocks_used: u32,
    idle_blocks_left: u32,
    /// Earliest instant the next ESSA packet may leave, enforces the
    /// configured packet spacing.
    next_packet_time: SimTime,
}

impl ChannelCtx {
    fn new(conf: AllocationChannelConfig) -> Self {
        Self {
            conf,
            crdsa_backoff_release: SimTime::ZERO,
            fsim_backoff_release: SimTime::ZERO,
            consecutive_blocks_used: 0,
            idle_blocks_left: 0,
            next_packet_time: SimTime::ZERO,
        }
    }
}

impl RandomAccess {
    pub fn new(channels: &[AllocationChannelConfig], seed: u64) -> Self {
        Self {
            channels: channels.iter().cloned().map(ChannelCtx::new).collect(),
            slot_tracker: SlotTracker::new(),
            rng: StdRng::seed_from_u64(seed),
            crdsa_unique_packet_id: 1,
            essa_scheduled: false,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn slot_tracker(&self) -> &SlotTracker {
        &self.slot_tracker
    }

    /// Frame boundary housekeeping, forgets claims from past superframes.
    pub fn prune_past_slots(&mut self, current_superframe_id: u64) {
        self.slot_tracker.prune_stale(current_superframe_id);
    }

    // --- Slotted Aloha ---

    pub fn slotted_aloha_allowed(&self, channel_id: ChannelId) -> bool {
        self.channels[channel_id as usize].conf.slotted_aloha_allowed
    }

    /// Picks one slot in the channel's randomization window of the given
    /// superframe: uniform random starting point, then first-available scan
    /// in increasing order with wrap-around. The returned slot is claimed in
    /// the registry. None when the whole window is already taken, the
    /// attempt is then a missed opportunity.
    pub fn slotted_aloha_select_slot(&mut self, channel_id: ChannelId, superframe_id: u64) -> Option<u16> {
        let conf = &self.channels[channel_id as usize].conf;
        let min = conf.crdsa_min_randomization_value;
        let max = conf.crdsa_max_randomization_value;
        let start = self.rng.random_range(min..=max);

        for slot_id in (start..=max).chain(min..start) {
            if self.slot_tracker.is_slot_available(superframe_id, channel_id, slot_id) {
                let claimed = self.slot_tracker.mark_slot_used(superframe_id, channel_id, slot_id);
                assert!(claimed, "slot {} vanished while claiming on channel {}", slot_id, channel_id);
                tracing::trace!("slotted aloha pick: sf {} ch {} slot {}", superframe_id, channel_id, slot_id);
                return Some(slot_id);
            }
        }
        tracing::debug!("slotted aloha: window [{}, {}] exhausted on sf {} ch {}", min, max, superframe_id, channel_id);
        None
    }

    // --- CRDSA ---

    /// Gate for scheduling a CRDSA block on this channel. Must be called
    /// exactly once per channel per frame start as it consumes the forced
    /// idle-block countdown.
    pub fn crdsa_block_eligible(&mut self, channel_id: ChannelId, now: SimTime) -> bool {
        let ch = &mut self.channels[channel_id as usize];
        if !ch.conf.crdsa_allowed {
            return false;
        }
        if ch.idle_blocks_left > 0 {
            ch.idle_blocks_left -= 1;
            ch.consecutive_blocks_used = 0;
            tracing::debug!("crdsa ch {}: forced idle, {} blocks left", channel_id, ch.idle_blocks_left);
            return false;
        }
        if now < ch.crdsa_backoff_release {
            tracing::debug!("crdsa ch {}: backoff until {}", channel_id, ch.crdsa_backoff_release);
            return false;
        }
        true
    }

    /// Replica slots for one CRDSA payload: `crdsa_num_of_instances`
    /// distinct slots drawn uniformly from the free part of the window.
    /// All returned slots are claimed in the registry. None when fewer free
    /// slots remain than instances needed.
    pub fn crdsa_select_replica_slots(&mut self, channel_id: ChannelId, superframe_id: u64) -> Option<Vec<u16>> {
        let conf = &self.channels[channel_id as usize].conf;
        let min = conf.crdsa_min_randomization_value;
        let max = conf.crdsa_max_randomization_value;
        let instances = conf.crdsa_num_of_instances as usize;

        let mut candidates: Vec<u16> = (min..=max)
            .filter(|slot_id| self.slot_tracker.is_slot_available(superframe_id, channel_id, *slot_id))
            .collect();
        if candidates.len() < instances {
            tracing::debug!(
                "crdsa ch {}: only {} free slots in [{}, {}] on sf {}, need {}",
                channel_id, candidates.len(), min, max, superframe_id, instances
            );
            return None;
        }

        let mut slots = Vec::with_capacity(instances);
        for _ in 0..instances {
            let idx = self.rng.random_range(0..candidates.len());
            let slot_id = candidates.swap_remove(idx);
            let claimed = self.slot_tracker.mark_slot_used(superframe_id, channel_id, slot_id);
            assert!(claimed, "replica slot {} double-claimed on channel {}", slot_id, channel_id);
            slots.push(slot_id);
        }
        slots.sort_unstable();
        tracing::trace!("crdsa pick: sf {} ch {} slots {:?}", superframe_id, channel_id, slots);
        Some(slots)
    }

    pub fn next_crdsa_packet_id(&mut self) -> u32 {
        let id = self.crdsa_unique_packet_id;
        self.crdsa_unique_packet_id = self.crdsa_unique_packet_id.wrapping_add(1);
        id
    }

    /// Block bookkeeping once the evaluation for this frame finished.
    /// Applies the consecutive-blocks limit and rolls the backoff
    /// probability against the block's transmit time.
    pub fn crdsa_block_done(&mut self, channel_id: ChannelId, payloads_scheduled: u32, block_tx_time: SimTime) {
        let ch = &mut self.channels[channel_id as usize];
        if payloads_scheduled == 0 {
            ch.consecutive_blocks_used = 0;
            return;
        }

        ch.consecutive_blocks_used += 1;
        if ch.consecutive_blocks_used >= ch.conf.crdsa_max_consecutive_blocks_accessed {
            ch.idle_blocks_left = ch.conf.crdsa_min_idle_blocks;
            ch.consecutive_blocks_used = 0;
            tracing::debug!("crdsa ch {}: consecutive block limit hit, idling for {} blocks", channel_id, ch.idle_blocks_left);
        }

        if self.rng.random::<f64>() < ch.conf.crdsa_backoff_probability {
            ch.crdsa_backoff_release = block_tx_time + ch.conf.crdsa_backoff_time;
            tracing::debug!("crdsa ch {}: backoff triggered, release at {}", channel_id, ch.crdsa_backoff_release);
        }
    }

    // --- ESSA ---

    pub fn essa_allowed(&self, channel_id: ChannelId, now: SimTime) -> bool {
        let ch = &self.channels[channel_id as usize];
        ch.conf.essa_allowed && now >= ch.fsim_backoff_release
    }

    pub fn is_essa_scheduled(&self) -> bool {
        self.essa_scheduled
    }

    pub fn set_essa_scheduled(&mut self, scheduled: bool) {
        self.essa_scheduled = scheduled;
    }

    /// Earliest permitted transmit time honoring the packet spacing, and
    /// advances the spacing cursor past it.
    pub fn essa_reserve_tx_time(&mut self, channel_id: ChannelId, now: SimTime) -> SimTime {
        let ch = &mut self.channels[channel_id as usize];
        let tx_time = ch.next_packet_time.max(now);
        ch.next_packet_time = tx_time + ch.conf.essa_packet_interval;
        tx_time
    }

    /// Rolls the F-SIM backoff probability after an ESSA transmission.
    pub fn essa_tx_done(&mut self, channel_id: ChannelId, tx_time: SimTime) {
        let ch = &mut self.channels[channel_id as usize];
        if self.rng.random::<f64>() < ch.conf.fsim_backoff_probability {
            ch.fsim_backoff_release = tx_time + ch.conf.fsim_backoff_time;
            tracing::debug!("essa ch {}: f-sim backoff triggered, release at {}", channel_id, ch.fsim_backoff_release);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn crdsa_channel(instances: u32, min: u16, max: u16) -> AllocationChannelConfig {
        AllocationChannelConfig {
            crdsa_allowed: true,
            crdsa_num_of_instances: instances,
            crdsa_min_randomization_value: min,
            crdsa_max_randomization_value: max,
            crdsa_backoff_probability: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn crdsa_replicas_are_distinct_and_in_window() {
        let mut ra = RandomAccess::new(&[crdsa_channel(3, 0, 9)], 7);
        let slots = ra.crdsa_select_replica_slots(0, 1).unwrap();
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| *s <= 9));
        assert!(slots.windows(2).all(|w| w[0] < w[1]));

        // A second payload in the same superframe stays disjoint
        let more = ra.crdsa_select_replica_slots(0, 1).unwrap();
        assert_eq!(more.len(), 3);
        assert!(more.iter().all(|s| !slots.contains(s)));
    }

    #[test]
    fn crdsa_runs_out_of_slots() {
        // Six slots, three instances per payload: third payload must fail
        let mut ra = RandomAccess::new(&[crdsa_channel(3, 0, 5)], 7);
        assert!(ra.crdsa_select_replica_slots(0, 1).is_some());
        assert!(ra.crdsa_select_replica_slots(0, 1).is_some());
        assert!(ra.crdsa_select_replica_slots(0, 1).is_none());
        // The next superframe has a fresh window
        assert!(ra.crdsa_select_replica_slots(0, 2).is_some());
    }

    #[test]
    fn crdsa_packet_ids_increment() {
        let mut ra = RandomAccess::new(&[crdsa_channel(3, 0, 9)], 7);
        let a = ra.next_crdsa_packet_id();
        let b = ra.next_crdsa_packet_id();
        assert_eq!(b, a + 1);
    }

    #[test]
    fn crdsa_backoff_blocks_channel_until_release() {
        let mut conf = crdsa_channel(3, 0, 9);
        conf.crdsa_backoff_probability = 1.0;
        conf.crdsa_backoff_time = SimTime::from_millis(250);
        let mut ra = RandomAccess::new(&[conf], 7);

        assert!(ra.crdsa_block_eligible(0, SimTime::ZERO));
        let block_tx = SimTime::from_millis(100);
        ra.crdsa_block_done(0, 1, block_tx);

        assert!(!ra.crdsa_block_eligible(0, SimTime::from_millis(200)));
        assert!(ra.crdsa_block_eligible(0, SimTime::from_millis(350)));
    }

    #[test]
    fn crdsa_consecutive_blocks_force_idle_period() {
        let mut conf = crdsa_channel(3, 0, 9);
        conf.crdsa_max_consecutive_blocks_accessed = 2;
        conf.crdsa_min_idle_blocks = 2;
        let mut ra = RandomAccess::new(&[conf], 7);
        let t = SimTime::ZERO;

        // Two used blocks in a row hit the limit
        assert!(ra.crdsa_block_eligible(0, t));
        ra.crdsa_block_done(0, 1, t);
        assert!(ra.crdsa_block_eligible(0, t));
        ra.crdsa_block_done(0, 1, t);

        // Exactly two idle blocks follow
        assert!(!ra.crdsa_block_eligible(0, t));
        assert!(!ra.crdsa_block_eligible(0, t));
        assert!(ra.crdsa_block_eligible(0, t));
    }

    #[test]
    fn crdsa_unused_block_resets_consecutive_count() {
        let mut conf = crdsa_channel(3, 0, 9);
        conf.crdsa_max_consecutive_blocks_accessed = 2;
        conf.crdsa_min_idle_blocks = 2;
        let mut ra = RandomAccess::new(&[conf], 7);
        let t = SimTime::ZERO;

        assert!(ra.crdsa_block_eligible(0, t));
        ra.crdsa_block_done(0, 1, t);
        // Nothing queued this block, the streak restarts
        assert!(ra.crdsa_block_eligible(0, t));
        ra.crdsa_block_done(0, 0, t);
        assert!(ra.crdsa_block_eligible(0, t));
        ra.crdsa_block_done(0, 1, t);
        // Still below the limit
        assert!(ra.crdsa_block_eligible(0, t));
    }

    #[test]
    fn slotted_aloha_claims_whole_window_then_misses() {
        let conf = AllocationChannelConfig {
            crdsa_min_randomization_value: 0,
            crdsa_max_randomization_value: 3,
            ..Default::default()
        };
        let mut ra = RandomAccess::new(&[conf], 7);

        let mut picked = Vec::new();
        for _ in 0..4 {
            let slot = ra.slotted_aloha_select_slot(0, 1).unwrap();
            assert!(slot <= 3);
            assert!(!picked.contains(&slot));
            picked.push(slot);
        }
        assert_eq!(ra.slotted_aloha_select_slot(0, 1), None);
    }

    #[test]
    fn essa_spacing_and_fsim_backoff() {
        let conf = AllocationChannelConfig {
            essa_allowed: true,
            essa_packet_interval: SimTime::from_millis(20),
            fsim_backoff_probability: 1.0,
            fsim_backoff_time: SimTime::from_millis(250),
            ..Default::default()
        };
        let mut ra = RandomAccess::new(&[conf], 7);
        let now = SimTime::from_millis(5);

        let first = ra.essa_reserve_tx_time(0, now);
        assert_eq!(first, now);
        let second = ra.essa_reserve_tx_time(0, now);
        assert_eq!(second, now + SimTime::from_millis(20));

        assert!(ra.essa_allowed(0, second));
        ra.essa_tx_done(0, second);
        assert!(!ra.essa_allowed(0, second + SimTime::from_millis(100)));
        assert!(ra.essa_allowed(0, second + SimTime::from_millis(250)));
    }
}
