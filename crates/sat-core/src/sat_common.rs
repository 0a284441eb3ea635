// SAPs between the entities of the terminal stack
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Sap {
    /// MAC/PHY
    PhySap,

    /// LLC/MAC
    LlcSap,

    /// Request manager / MAC
    RmSap,

    /// Self-addressed timer events, delivered through the event scheduler
    TimerSap,
}

/// Identity of a terminal, assigned by the network and carried in signaling
pub type TerminalId = u32;

/// Spot-beam identifier
pub type BeamId = u32;

/// Return-link carrier identifier within a beam
pub type CarrierId = u16;

/// Request class index (traffic class at the LLC and in capacity signaling)
pub type RcIndex = u8;

/// Random-access allocation channel identifier
pub type ChannelId = u8;

/// Address of the serving gateway, as announced in beam-switch signaling
pub type GwAddress = u64;
