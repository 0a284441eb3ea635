use sat_core::sat_common::{BeamId, CarrierId, ChannelId, RcIndex};
use sat_core::SimTime;
use sat_pdus::CtrlMsg;

/// Access mode a return-link burst was scheduled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAccessMode {
    /// Demand-assigned, granted through a TBTP.
    Da,
    SlottedAloha,
    Crdsa,
    Essa,
    /// Logon request on the logon allocation channel.
    Logon,
}

/// One MAC packet carried inside a burst.
#[derive(Debug, Clone)]
pub struct MacPacket {
    pub kind: PacketKind,
    pub len_bytes: u32,
    pub rc_index: RcIndex,
}

#[derive(Debug, Clone)]
pub enum PacketKind {
    /// Opaque user data, only the length matters.
    Data,
    Control(CtrlMsg),
}

/// Replica bookkeeping attached to every CRDSA burst. All replicas of one
/// packet share the unique packet id and each carries the slot ids of the
/// whole replica set, its own slot included.
#[derive(Debug, Clone)]
pub struct CrdsaReplicaTag {
    pub packet_id: u32,
    pub slot_ids: Vec<u16>,
}

/// A return-link burst as handed to the PHY for transmission.
#[derive(Debug)]
pub struct SatBurst {
    pub access: TxAccessMode,
    pub carrier_id: CarrierId,
    /// Allocation channel the burst was scheduled on, random access only.
    pub channel_id: Option<ChannelId>,
    /// Time slot within the channel's frame, `None` for ESSA (async spreading).
    pub slot_id: Option<u16>,
    pub duration: SimTime,
    pub packets: Vec<MacPacket>,
    pub crdsa: Option<CrdsaReplicaTag>,
}

impl SatBurst {
    pub fn total_bytes(&self) -> u32 {
        self.packets.iter().map(|p| p.len_bytes).sum()
    }
}

/// MAC asks the PHY to transmit a burst on the return link.
#[derive(Debug)]
pub struct PhyTxReq {
    pub burst: SatBurst,
}

/// PHY delivers a received return-link burst to the NCC.
#[derive(Debug)]
pub struct PhyRxInd {
    pub burst: SatBurst,
}

/// Forward-link signaling delivered to the MAC. The forward link is not
/// capacity-modeled, control messages arrive as typed structs.
#[derive(Debug)]
pub struct PhySignalingInd {
    pub msg: CtrlMsg,
}

/// Retune the PHY to another beam after a completed handover.
#[derive(Debug)]
pub struct PhyConfigureReq {
    pub beam_id: BeamId,
}
