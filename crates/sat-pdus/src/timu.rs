use sat_core::{BeamId, GwAddress, TerminalId};

/// TIM-U: instruction for one terminal to switch its service to another
/// spot beam. Carries the gateway serving the target beam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimuMessage {
    pub terminal_id: TerminalId,
    pub target_beam_id: BeamId,
    pub gw_address: GwAddress,
}
