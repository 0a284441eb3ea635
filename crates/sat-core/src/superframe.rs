use crate::sim_time::SimTime;

/// Modulus applied to superframe ids carried in signaling messages.
/// Absolute superframe ids count from stack start and never wrap; the wire
/// representation wraps at this value.
pub const SUPERFRAME_WIRE_MODULUS: u32 = 0x10000;

/// Signed difference between two wire superframe ids, handling wrap-around.
pub fn wire_id_diff(a: u32, b: u32) -> i32 {
    let m = SUPERFRAME_WIRE_MODULUS as i32;
    let mut diff = a as i32 - b as i32;
    while diff < -m / 2 { diff += m; }
    while diff >= m / 2 { diff -= m; }
    diff
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperframeConfErr {
    NoSequences,
    NoFrames,
    ZeroFrameDuration { frame: usize },
    NoTimeSlots { frame: usize },
}

/// Static configuration of one frame within a superframe.
/// Time slots within a frame are uniform.
#[derive(Debug, Clone)]
pub struct FrameConf {
    duration: SimTime,
    slot_count: u16,
}

impl FrameConf {
    pub fn new(duration: SimTime, slot_count: u16) -> Result<FrameConf, SuperframeConfErr> {
        if duration.is_zero() {
            return Err(SuperframeConfErr::ZeroFrameDuration { frame: 0 });
        }
        if slot_count == 0 {
            return Err(SuperframeConfErr::NoTimeSlots { frame: 0 });
        }
        Ok(FrameConf { duration, slot_count })
    }

    pub fn duration(&self) -> SimTime {
        self.duration
    }

    pub fn slot_count(&self) -> u16 {
        self.slot_count
    }

    pub fn slot_duration(&self) -> SimTime {
        self.duration.div_by(self.slot_count as u64)
    }

    /// Offset of a slot start relative to the start of this frame
    pub fn slot_offset(&self, slot: u16) -> SimTime {
        assert!(slot < self.slot_count, "slot {} out of range (frame has {} slots)", slot, self.slot_count);
        self.slot_duration() * slot as u64
    }
}

/// Static configuration of one superframe: an ordered list of frames.
#[derive(Debug, Clone)]
pub struct SuperframeConf {
    frames: Vec<FrameConf>,
    duration: SimTime,
}

impl SuperframeConf {
    pub fn new(frames: Vec<FrameConf>) -> Result<SuperframeConf, SuperframeConfErr> {
        if frames.is_empty() {
            return Err(SuperframeConfErr::NoFrames);
        }
        for (i, frame) in frames.iter().enumerate() {
            if frame.duration.is_zero() {
                return Err(SuperframeConfErr::ZeroFrameDuration { frame: i });
            }
            if frame.slot_count == 0 {
                return Err(SuperframeConfErr::NoTimeSlots { frame: i });
            }
        }
        let mut duration = SimTime::ZERO;
        for frame in &frames {
            duration += frame.duration;
        }
        Ok(SuperframeConf { frames, duration })
    }

    pub fn duration(&self) -> SimTime {
        self.duration
    }

    pub fn frames(&self) -> &[FrameConf] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&FrameConf> {
        self.frames.get(index)
    }

    /// Offset of a frame start relative to the start of the superframe
    pub fn frame_start_offset(&self, index: usize) -> SimTime {
        assert!(index < self.frames.len(), "frame index {} out of range ({} frames)", index, self.frames.len());
        let mut offset = SimTime::ZERO;
        for frame in &self.frames[..index] {
            offset += frame.duration;
        }
        offset
    }
}

/// Container of superframe configurations, indexed by sequence id.
///
/// All lookups with an unknown sequence id panic: sequence ids come from
/// validated configuration and from signaling already checked against it,
/// so a miss is a setup bug rather than a runtime condition.
#[derive(Debug, Clone)]
pub struct SuperframeSeq {
    confs: Vec<SuperframeConf>,
}

impl SuperframeSeq {
    pub fn new(confs: Vec<SuperframeConf>) -> Result<SuperframeSeq, SuperframeConfErr> {
        if confs.is_empty() {
            return Err(SuperframeConfErr::NoSequences);
        }
        Ok(SuperframeSeq { confs })
    }

    pub fn conf(&self, seq: u8) -> &SuperframeConf {
        match self.confs.get(seq as usize) {
            Some(conf) => conf,
            None => panic!("unknown superframe sequence id {}", seq),
        }
    }

    pub fn superframe_duration(&self, seq: u8) -> SimTime {
        self.conf(seq).duration
    }

    /// Absolute id of the superframe containing `now`
    pub fn superframe_id_at(&self, seq: u8, now: SimTime) -> u64 {
        now.as_nanos() / self.conf(seq).duration.as_nanos()
    }

    /// Start time of the superframe with the given absolute id
    pub fn superframe_start_time(&self, seq: u8, id: u64) -> SimTime {
        self.conf(seq).duration * id
    }

    /// Start time of the superframe containing `now`
    pub fn current_superframe_start(&self, seq: u8, now: SimTime) -> SimTime {
        self.superframe_start_time(seq, self.superframe_id_at(seq, now))
    }

    /// First superframe boundary strictly after `now`.
    /// Used to schedule the next frame-start tick.
    pub fn next_superframe_start(&self, seq: u8, now: SimTime) -> SimTime {
        self.superframe_start_time(seq, self.superframe_id_at(seq, now) + 1)
    }

    /// Wire representation of an absolute superframe id
    pub fn wire_superframe_id(id: u64) -> u32 {
        (id % SUPERFRAME_WIRE_MODULUS as u64) as u32
    }

    /// Maps a wire superframe id from signaling back to an absolute id,
    /// relative to the current superframe. Wire ids resolving to the past
    /// yield None; the caller decides whether that is worth a warning.
    pub fn resolve_wire_id(current_id: u64, wire: u32) -> Option<u64> {
        let diff = wire_id_diff(wire, Self::wire_superframe_id(current_id));
        if diff < 0 {
            None
        } else {
            Some(current_id + diff as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seq() -> SuperframeSeq {
        // Two frames of 10 slots each, 100 ms superframe
        let frames = vec![
            FrameConf::new(SimTime::from_millis(50), 10).unwrap(),
            FrameConf::new(SimTime::from_millis(50), 10).unwrap(),
        ];
        SuperframeSeq::new(vec![SuperframeConf::new(frames).unwrap()]).unwrap()
    }

    #[test]
    fn test_construction_validation() {
        assert!(matches!(SuperframeConf::new(vec![]), Err(SuperframeConfErr::NoFrames)));
        assert!(matches!(
            FrameConf::new(SimTime::ZERO, 4),
            Err(SuperframeConfErr::ZeroFrameDuration { .. })
        ));
        assert!(matches!(
            FrameConf::new(SimTime::from_millis(10), 0),
            Err(SuperframeConfErr::NoTimeSlots { .. })
        ));
        assert!(matches!(SuperframeSeq::new(vec![]), Err(SuperframeConfErr::NoSequences)));
    }

    #[test]
    fn test_superframe_boundaries() {
        let seq = test_seq();
        assert_eq!(seq.superframe_duration(0), SimTime::from_millis(100));

        assert_eq!(seq.superframe_id_at(0, SimTime::ZERO), 0);
        assert_eq!(seq.superframe_id_at(0, SimTime::from_millis(99)), 0);
        // An instant on the boundary belongs to the new superframe
        assert_eq!(seq.superframe_id_at(0, SimTime::from_millis(100)), 1);

        assert_eq!(seq.superframe_start_time(0, 3), SimTime::from_millis(300));
        assert_eq!(seq.current_superframe_start(0, SimTime::from_millis(250)), SimTime::from_millis(200));

        // Next boundary is strictly after now, also when now is on a boundary
        assert_eq!(seq.next_superframe_start(0, SimTime::from_millis(100)), SimTime::from_millis(200));
        assert_eq!(seq.next_superframe_start(0, SimTime::from_millis(199)), SimTime::from_millis(200));
    }

    #[test]
    fn test_frame_and_slot_offsets() {
        let seq = test_seq();
        let conf = seq.conf(0);
        assert_eq!(conf.frame_start_offset(0), SimTime::ZERO);
        assert_eq!(conf.frame_start_offset(1), SimTime::from_millis(50));

        let frame = conf.frame(1).unwrap();
        assert_eq!(frame.slot_duration(), SimTime::from_millis(5));
        assert_eq!(frame.slot_offset(0), SimTime::ZERO);
        assert_eq!(frame.slot_offset(9), SimTime::from_millis(45));
    }

    #[test]
    fn test_wire_id_wraparound() {
        assert_eq!(wire_id_diff(1, 0xFFFF), 2);
        assert_eq!(wire_id_diff(0xFFFF, 1), -2);
        assert_eq!(wire_id_diff(5, 5), 0);

        assert_eq!(SuperframeSeq::wire_superframe_id(0x1_0002), 2);
        assert_eq!(SuperframeSeq::resolve_wire_id(0xFFFF, 1), Some(0x1_0001));
        assert_eq!(SuperframeSeq::resolve_wire_id(10, 12), Some(12));
        // Wire id pointing into the past is rejected
        assert_eq!(SuperframeSeq::resolve_wire_id(12, 10), None);
    }

    #[test]
    #[should_panic(expected = "unknown superframe sequence id")]
    fn test_unknown_sequence_id_panics() {
        test_seq().superframe_duration(3);
    }
}
