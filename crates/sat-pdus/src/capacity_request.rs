use sat_core::{RcIndex, TerminalId};

/// Capacity request towards the network scheduler: queued bytes per
/// request class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRequest {
    pub terminal_id: TerminalId,
    pub requests: Vec<CapacityRequestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRequestEntry {
    pub rc_index: RcIndex,
    pub requested_bytes: u32,
}

impl CapacityRequest {
    /// Size on the air, for capacity accounting.
    pub fn len_bytes(&self) -> u32 {
        8 + 4 * self.requests.len() as u32
    }
}
