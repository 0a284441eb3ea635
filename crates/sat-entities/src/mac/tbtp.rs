use sat_core::sat_common::{CarrierId, RcIndex, TerminalId};
use sat_core::{SimTime, SuperframeSeq};
use sat_pdus::TbtpMessage;

/// One demand-assigned grant resolved to an absolute transmit time.
#[derive(Debug, Clone, PartialEq)]
pub struct DaGrant {
    pub tx_time: SimTime,
    pub duration: SimTime,
    pub carrier_id: CarrierId,
    pub waveform_id: u8,
    pub rc_index: RcIndex,
    pub payload_bytes: u32,
}

#[derive(Debug)]
pub struct TbtpSchedule {
    /// Unwrapped id of the superframe the TBTP applies to.
    pub superframe_id: u64,
    pub grants: Vec<DaGrant>,
    /// Granted bytes per request class, reported to the request manager.
    pub bytes_per_rc: Vec<u32>,
}

/// Resolves TBTP messages against this terminal's timing model.
///
/// A terminal transmits early by its timing advance, and each burst starts a
/// guard time ahead of the nominal slot boundary.
pub struct TbtpConsumer {
    terminal_id: TerminalId,
    timing_advance: SimTime,
    guard_time: SimTime,
    rc_count: usize,
}

impl TbtpConsumer {
    pub fn new(terminal_id: TerminalId, timing_advance: SimTime, guard_time: SimTime, rc_count: usize) -> Self {
        Self {
            terminal_id,
            timing_advance,
            guard_time,
            rc_count,
        }
    }

    /// Extracts this terminal's grants with absolute transmit times. None
    /// when the TBTP does not name the terminal or refers to a superframe
    /// that already passed. Out-of-range grant entries are dropped with a
    /// warning, the network may legitimately grant nothing.
    pub fn consume(&self, tbtp: &TbtpMessage, seq: &SuperframeSeq, now: SimTime) -> Option<TbtpSchedule> {
        let seq_id = tbtp.superframe_seq_id;
        let current_id = seq.superframe_id_at(seq_id, now);
        let Some(superframe_id) = SuperframeSeq::resolve_wire_id(current_id, tbtp.superframe_wire_id) else {
            tracing::warn!(
                "tbtp for past superframe ignored (wire id {}, current {})",
                tbtp.superframe_wire_id, current_id
            );
            return None;
        };

        let entry = tbtp.entry_for(self.terminal_id)?;

        let conf = seq.conf(seq_id);
        let superframe_start = seq.superframe_start_time(seq_id, superframe_id) + self.timing_advance;
        let mut grants = Vec::new();
        let mut bytes_per_rc = vec![0u32; self.rc_count];

        for slot in &entry.slots {
            let Some(frame) = conf.frame(slot.frame_index) else {
                tracing::warn!("tbtp grant names frame {} outside the superframe, dropped", slot.frame_index);
                continue;
            };
            if slot.slot_id >= frame.slot_count() {
                tracing::warn!(
                    "tbtp grant names slot {} beyond frame {} ({} slots), dropped",
                    slot.slot_id, slot.frame_index, frame.slot_count()
                );
                continue;
            }
            if slot.rc_index as usize >= self.rc_count {
                tracing::warn!("tbtp grant names unknown request class {}, dropped", slot.rc_index);
                continue;
            }

            let nominal = superframe_start
                + conf.frame_start_offset(slot.frame_index)
                + frame.slot_offset(slot.slot_id);
            if nominal < now {
                tracing::debug!("tbtp grant for slot {} already started at {}, dropped", slot.slot_id, nominal);
                continue;
            }
            // The guard time may not pull the transmission before "now"
            let tx_time = nominal.saturating_sub(self.guard_time).max(now);

            bytes_per_rc[slot.rc_index as usize] += slot.payload_bytes;
            grants.push(DaGrant {
                tx_time,
                duration: frame.slot_duration(),
                carrier_id: slot.carrier_id,
                waveform_id: slot.waveform_id,
                rc_index: slot.rc_index,
                payload_bytes: slot.payload_bytes,
            });
        }

        tracing::debug!(
            "tbtp for sf {}: {} grant(s), {} bytes total",
            superframe_id,
            grants.len(),
            bytes_per_rc.iter().sum::<u32>()
        );
        Some(TbtpSchedule {
            superframe_id,
            grants,
            bytes_per_rc,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use sat_core::{FrameConf, SuperframeConf};
    use sat_pdus::{TbtpEntry, TbtpTimeSlotInfo};

    // Two frames of 50 ms with 10 slots each, 5 ms per slot
    fn seq() -> SuperframeSeq {
        let frames = vec![
            FrameConf::new(SimTime::from_millis(50), 10).unwrap(),
            FrameConf::new(SimTime::from_millis(50), 10).unwrap(),
        ];
        SuperframeSeq::new(vec![SuperframeConf::new(frames).unwrap()]).unwrap()
    }

    fn slot(frame_index: usize, slot_id: u16, rc_index: RcIndex, bytes: u32) -> TbtpTimeSlotInfo {
        TbtpTimeSlotInfo {
            frame_index,
            slot_id,
            carrier_id: 2,
            waveform_id: 3,
            rc_index,
            payload_bytes: bytes,
        }
    }

    fn tbtp_for(terminal_id: TerminalId, wire_id: u32, slots: Vec<TbtpTimeSlotInfo>) -> TbtpMessage {
        let mut tbtp = TbtpMessage::new(0, wire_id);
        tbtp.entries.push(TbtpEntry { terminal_id, slots });
        tbtp
    }

    #[test]
    fn grant_times_follow_the_slot_layout() {
        let consumer = TbtpConsumer::new(1, SimTime::from_micros(40), SimTime::from_micros(1), 3);
        let tbtp = tbtp_for(1, 3, vec![slot(0, 2, 1, 500), slot(1, 0, 1, 400)]);
        let now = SimTime::from_millis(250);

        let schedule = consumer.consume(&tbtp, &seq(), now).unwrap();
        assert_eq!(schedule.superframe_id, 3);
        assert_eq!(schedule.grants.len(), 2);

        // sf 3 starts at 300 ms; + timing advance + frame/slot offsets - guard
        let base = SimTime::from_millis(300) + SimTime::from_micros(40);
        assert_eq!(
            schedule.grants[0].tx_time,
            base + SimTime::from_millis(10) - SimTime::from_micros(1)
        );
        assert_eq!(
            schedule.grants[1].tx_time,
            base + SimTime::from_millis(50) - SimTime::from_micros(1)
        );
        assert_eq!(schedule.grants[0].duration, SimTime::from_millis(5));
        assert_eq!(schedule.bytes_per_rc, vec![0, 900, 0]);
    }

    #[test]
    fn tbtp_not_naming_this_terminal_is_none() {
        let consumer = TbtpConsumer::new(1, SimTime::ZERO, SimTime::ZERO, 3);
        let tbtp = tbtp_for(99, 1, vec![slot(0, 0, 0, 500)]);
        assert!(consumer.consume(&tbtp, &seq(), SimTime::ZERO).is_none());
    }

    #[test]
    fn tbtp_for_past_superframe_is_none() {
        let consumer = TbtpConsumer::new(1, SimTime::ZERO, SimTime::ZERO, 3);
        let tbtp = tbtp_for(1, 1, vec![slot(0, 0, 0, 500)]);
        // Superframes are 100 ms, wire id 1 is long gone at 1 s
        assert!(consumer.consume(&tbtp, &seq(), SimTime::from_secs(1)).is_none());
    }

    #[test]
    fn out_of_range_entries_are_dropped_not_fatal() {
        let consumer = TbtpConsumer::new(1, SimTime::ZERO, SimTime::ZERO, 3);
        let tbtp = tbtp_for(
            1,
            2,
            vec![
                slot(5, 0, 0, 100),  // no such frame
                slot(0, 99, 0, 100), // no such slot
                slot(0, 1, 7, 100),  // no such request class
                slot(0, 4, 2, 300),
            ],
        );
        let schedule = consumer.consume(&tbtp, &seq(), SimTime::from_millis(150)).unwrap();
        assert_eq!(schedule.grants.len(), 1);
        assert_eq!(schedule.bytes_per_rc, vec![0, 0, 300]);
    }

    #[test]
    fn empty_entry_still_resolves() {
        let consumer = TbtpConsumer::new(1, SimTime::ZERO, SimTime::ZERO, 3);
        let tbtp = tbtp_for(1, 2, vec![]);
        let schedule = consumer.consume(&tbtp, &seq(), SimTime::from_millis(100)).unwrap();
        assert!(schedule.grants.is_empty());
        assert_eq!(schedule.bytes_per_rc, vec![0, 0, 0]);
    }

    #[test]
    fn guard_time_never_pulls_before_now() {
        let consumer = TbtpConsumer::new(1, SimTime::ZERO, SimTime::from_millis(20), 3);
        // Grant in the current superframe, first slot of frame 1 at 150 ms
        let tbtp = tbtp_for(1, 1, vec![slot(1, 0, 0, 500)]);
        let now = SimTime::from_millis(140);
        let schedule = consumer.consume(&tbtp, &seq(), now).unwrap();
        assert_eq!(schedule.grants[0].tx_time, now);
    }

    #[test]
    fn slot_that_already_started_is_dropped() {
        let consumer = TbtpConsumer::new(1, SimTime::ZERO, SimTime::ZERO, 3);
        let tbtp = tbtp_for(1, 1, vec![slot(0, 0, 0, 500), slot(1, 5, 0, 200)]);
        // Halfway through superframe 1: frame 0 slots are history
        let now = SimTime::from_millis(160);
        let schedule = consumer.consume(&tbtp, &seq(), now).unwrap();
        assert_eq!(schedule.grants.len(), 1);
        assert_eq!(schedule.grants[0].payload_bytes, 200);
    }
}
