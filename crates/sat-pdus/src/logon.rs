use sat_core::{ChannelId, TerminalId};

/// Logon request sent by a terminal that is not yet admitted to the
/// return link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonRequest {
    pub terminal_id: TerminalId,
}

impl LogonRequest {
    /// Size on the air, for capacity accounting.
    pub fn len_bytes(&self) -> u32 {
        12
    }
}

/// Network answer admitting the terminal and assigning its RA channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonResponse {
    pub terminal_id: TerminalId,
    pub assigned_ra_channel: ChannelId,
}
