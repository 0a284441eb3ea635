use sat_core::{ChannelId, SimTime};

const DEFAULT_CRDSA_PERSISTENCE: u16 = 10000;
const DEFAULT_FSIM_PERSISTENCE: u16 = 5;

/// Static configuration of one random-access allocation channel.
///
/// Holds which contention schemes the channel allows and their numeric
/// tuning. The runtime counters (backoff release time, idle blocks left,
/// consecutive blocks used) live with the contention engine; this struct
/// is immutable after load.
#[derive(Debug, Clone)]
pub struct AllocationChannelConfig {
    /// Position of this channel in the terminal's channel list.
    pub channel_id: ChannelId,
    /// Frame of the superframe whose slots this channel uses.
    pub frame_index: usize,

    pub slotted_aloha_allowed: bool,
    pub crdsa_allowed: bool,
    pub essa_allowed: bool,

    /// Payload bytes requested from the link layer per RA opportunity.
    pub payload_bytes: u32,

    /// Lowest slot id of the randomization window.
    pub crdsa_min_randomization_value: u16,
    /// Highest slot id of the randomization window, inclusive.
    pub crdsa_max_randomization_value: u16,
    /// Replica count per unique payload.
    pub crdsa_num_of_instances: u32,
    /// Unique payloads the terminal may place into one block.
    pub crdsa_max_unique_payload_per_block: u32,
    /// Blocks the terminal may use back to back before it is forced idle.
    pub crdsa_max_consecutive_blocks_accessed: u32,
    /// Idle blocks served once the consecutive limit is reached.
    pub crdsa_min_idle_blocks: u32,
    pub crdsa_backoff_time: SimTime,
    /// Derived from a 16-bit persistence value, see
    /// [`Self::derive_crdsa_backoff_probability`].
    pub crdsa_backoff_probability: f64,

    pub fsim_backoff_time: SimTime,
    /// Derived from the F-SIM persistence value, see
    /// [`Self::derive_fsim_backoff_probability`].
    pub fsim_backoff_probability: f64,

    /// Minimum spacing between consecutive ESSA transmissions.
    pub essa_packet_interval: SimTime,
}

impl Default for AllocationChannelConfig {
    fn default() -> Self {
        Self {
            channel_id: 0,
            frame_index: 0,
            slotted_aloha_allowed: true,
            crdsa_allowed: false,
            essa_allowed: false,
            payload_bytes: 500,
            crdsa_min_randomization_value: 0,
            crdsa_max_randomization_value: 159,
            crdsa_num_of_instances: 3,
            crdsa_max_unique_payload_per_block: 3,
            crdsa_max_consecutive_blocks_accessed: 4,
            crdsa_min_idle_blocks: 2,
            crdsa_backoff_time: SimTime::from_millis(250),
            crdsa_backoff_probability: Self::derive_crdsa_backoff_probability(
                DEFAULT_CRDSA_PERSISTENCE,
            ),
            fsim_backoff_time: SimTime::from_millis(250),
            fsim_backoff_probability: Self::derive_fsim_backoff_probability(
                DEFAULT_FSIM_PERSISTENCE,
            ),
            essa_packet_interval: SimTime::from_millis(20),
        }
    }
}

impl AllocationChannelConfig {
    /// CRDSA backoff probability from a 16-bit persistence value:
    /// `(value + 1) / 2^16`. Lands in (0, 1] for every input.
    pub fn derive_crdsa_backoff_probability(persistence: u16) -> f64 {
        (persistence as f64 + 1.0) / f64::from(1u32 << 16)
    }

    /// F-SIM backoff probability from the persistence value:
    /// `1 / 2^(persistence / 2)`. Underflows to 0 for very large inputs,
    /// which [`Self::sanity_check`] then rejects.
    pub fn derive_fsim_backoff_probability(persistence: u16) -> f64 {
        1.0 / f64::powf(2.0, persistence as f64 / 2.0)
    }

    /// Configuration-time parameter sanity check. Out-of-range values are
    /// a setup error and are never clamped.
    pub fn sanity_check(&self) -> Result<(), &str> {
        if self.crdsa_num_of_instances < 1 {
            return Err("crdsa replica count must be at least 1");
        }
        if self.crdsa_min_randomization_value > self.crdsa_max_randomization_value {
            return Err("crdsa randomization window minimum exceeds maximum");
        }
        if self.crdsa_max_unique_payload_per_block < 1 {
            return Err("crdsa unique payloads per block must be at least 1");
        }
        let window = u64::from(self.crdsa_max_randomization_value)
            - u64::from(self.crdsa_min_randomization_value)
            + 1;
        let slots_needed = u64::from(self.crdsa_num_of_instances)
            * u64::from(self.crdsa_max_unique_payload_per_block);
        if window < slots_needed {
            return Err("crdsa randomization window too small for the configured replicas");
        }
        if !(self.crdsa_backoff_probability > 0.0 && self.crdsa_backoff_probability <= 1.0) {
            return Err("crdsa backoff probability outside (0, 1]");
        }
        if !(self.fsim_backoff_probability > 0.0 && self.fsim_backoff_probability <= 1.0) {
            return Err("fsim backoff probability outside (0, 1]");
        }
        if self.payload_bytes == 0 {
            return Err("payload bytes must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crdsa_probability_in_range_and_monotone() {
        let mut prev = 0.0;
        for p in [0u16, 1, 255, 4095, 10000, 32767, 65534, 65535] {
            let prob = AllocationChannelConfig::derive_crdsa_backoff_probability(p);
            assert!(prob > 0.0 && prob <= 1.0, "persistence {} gave {}", p, prob);
            assert!(prob >= prev, "not monotone at persistence {}", p);
            prev = prob;
        }
        assert_eq!(AllocationChannelConfig::derive_crdsa_backoff_probability(u16::MAX), 1.0);
    }

    #[test]
    fn test_fsim_probability_in_range() {
        assert_eq!(AllocationChannelConfig::derive_fsim_backoff_probability(0), 1.0);
        let mut prev = f64::INFINITY;
        for p in [0u16, 1, 2, 10, 100, 1000, 2000] {
            let prob = AllocationChannelConfig::derive_fsim_backoff_probability(p);
            assert!(prob > 0.0 && prob <= 1.0, "persistence {} gave {}", p, prob);
            assert!(prob <= prev, "not non-increasing at persistence {}", p);
            prev = prob;
        }
    }

    #[test]
    fn test_fsim_underflow_rejected() {
        let cfg = AllocationChannelConfig {
            fsim_backoff_probability: AllocationChannelConfig::derive_fsim_backoff_probability(
                u16::MAX,
            ),
            ..Default::default()
        };
        assert!(cfg.sanity_check().is_err());
    }

    #[test]
    fn test_sanity_check() {
        assert!(AllocationChannelConfig::default().sanity_check().is_ok());

        let cfg = AllocationChannelConfig {
            crdsa_num_of_instances: 0,
            ..Default::default()
        };
        assert!(cfg.sanity_check().is_err());

        let cfg = AllocationChannelConfig {
            crdsa_min_randomization_value: 10,
            crdsa_max_randomization_value: 5,
            ..Default::default()
        };
        assert!(cfg.sanity_check().is_err());

        // window of 9 slots cannot hold 3 replicas x 4 payloads
        let cfg = AllocationChannelConfig {
            crdsa_min_randomization_value: 0,
            crdsa_max_randomization_value: 8,
            crdsa_num_of_instances: 3,
            crdsa_max_unique_payload_per_block: 4,
            ..Default::default()
        };
        assert!(cfg.sanity_check().is_err());

        // exactly large enough is fine
        let cfg = AllocationChannelConfig {
            crdsa_min_randomization_value: 0,
            crdsa_max_randomization_value: 8,
            crdsa_num_of_instances: 3,
            crdsa_max_unique_payload_per_block: 3,
            ..Default::default()
        };
        assert!(cfg.sanity_check().is_ok());
    }
}
