use sat_core::{BeamId, TerminalId};

/// Recommendation from a terminal that its service should move to
/// another spot beam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoverRecommendation {
    pub terminal_id: TerminalId,
    pub recommended_beam_id: BeamId,
}

impl HandoverRecommendation {
    /// Size on the air, for capacity accounting.
    pub fn len_bytes(&self) -> u32 {
        10
    }
}
