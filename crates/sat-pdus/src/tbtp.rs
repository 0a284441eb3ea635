use sat_core::{CarrierId, RcIndex, TerminalId};

/// Terminal Burst Time Plan: the periodic allocation message granting
/// demand-assigned time slots to specific terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct TbtpMessage {
    pub superframe_seq_id: u8,
    /// Superframe this plan applies to, reduced to the 16-bit wire modulus.
    pub superframe_wire_id: u32,
    pub entries: Vec<TbtpEntry>,
}

/// Allocations for one terminal within the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TbtpEntry {
    pub terminal_id: TerminalId,
    pub slots: Vec<TbtpTimeSlotInfo>,
}

/// One granted time slot, addressed by frame and slot number within the
/// target superframe.
#[derive(Debug, Clone, PartialEq)]
pub struct TbtpTimeSlotInfo {
    pub frame_index: usize,
    pub slot_id: u16,
    pub carrier_id: CarrierId,
    pub waveform_id: u8,
    pub rc_index: RcIndex,
    pub payload_bytes: u32,
}

impl TbtpMessage {
    pub fn new(superframe_seq_id: u8, superframe_wire_id: u32) -> Self {
        Self {
            superframe_seq_id,
            superframe_wire_id,
            entries: Vec::new(),
        }
    }

    /// Allocations addressed to the given terminal, if any.
    pub fn entry_for(&self, terminal_id: TerminalId) -> Option<&TbtpEntry> {
        self.entries.iter().find(|e| e.terminal_id == terminal_id)
    }
}
