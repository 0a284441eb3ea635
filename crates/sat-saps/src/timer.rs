use sat_core::sat_common::{CarrierId, ChannelId, RcIndex};
use sat_core::SimTime;
use sat_pdus::CtrlMsg;

use crate::phy::MacPacket;

/// Timer indication the MAC scheduled for itself.
#[derive(Debug)]
pub struct MacTimerInd {
    pub kind: MacTimer,
}

#[derive(Debug)]
pub enum MacTimer {
    /// Start of the next frame, drives logon retries and per-frame
    /// random access evaluation.
    FrameStart,
    /// A previously scheduled transmission is due now.
    TxFire(TxFireJob),
}

/// Everything the MAC needs at fire time to turn a scheduled transmission
/// into a burst.
#[derive(Debug)]
pub enum TxFireJob {
    Da(DaTxJob),
    SlottedAloha(RaTxJob),
    CrdsaReplica(CrdsaTxJob),
    Essa(EssaTxJob),
    Logon(RaTxJob),
}

/// Demand-assigned slot granted through a TBTP. The payload is fetched from
/// the LLC when the job fires.
#[derive(Debug, Clone)]
pub struct DaTxJob {
    pub carrier_id: CarrierId,
    pub duration: SimTime,
    pub waveform_id: u8,
    pub rc_index: RcIndex,
    pub payload_bytes: u32,
}

/// Slotted Aloha and logon transmissions carry their control message from
/// the moment they are scheduled.
#[derive(Debug)]
pub struct RaTxJob {
    pub channel_id: ChannelId,
    pub slot_id: u16,
    pub duration: SimTime,
    pub msg: CtrlMsg,
}

/// One CRDSA replica. The payload was fetched when the block was evaluated
/// and is duplicated into every replica of the set.
#[derive(Debug)]
pub struct CrdsaTxJob {
    pub channel_id: ChannelId,
    pub slot_id: u16,
    pub duration: SimTime,
    pub packet_id: u32,
    /// Slot ids of the whole replica set, own slot included.
    pub slot_ids: Vec<u16>,
    pub packets: Vec<MacPacket>,
}

#[derive(Debug, Clone)]
pub struct EssaTxJob {
    pub channel_id: ChannelId,
    pub rc_index: RcIndex,
    pub payload_bytes: u32,
    pub duration: SimTime,
}

/// Periodic capacity evaluation tick of the request manager.
#[derive(Debug)]
pub struct RmTimerInd {}

/// Timer indication the NCC scheduled for itself.
#[derive(Debug)]
pub struct NccTimerInd {
    pub kind: NccTimer,
}

#[derive(Debug)]
pub enum NccTimer {
    /// Generate and broadcast the next TBTP.
    TbtpTick,
    /// Delayed forward-link control message, e.g. a logon response held
    /// back by the configured processing delay.
    Forward(CtrlMsg),
}
