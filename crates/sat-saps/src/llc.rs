use sat_core::sat_common::{ChannelId, RcIndex};

use crate::phy::MacPacket;
use crate::timer::{DaTxJob, EssaTxJob};

/// Upper layer hands traffic to the LLC. Only the byte count is modeled.
#[derive(Debug)]
pub struct LlcEnqueueReq {
    pub rc_index: RcIndex,
    pub bytes: u32,
}

/// Queue state change, sent by the LLC to both the MAC and the request
/// manager.
#[derive(Debug)]
pub struct QueueEventInd {
    pub event: QueueEvent,
    pub rc_index: RcIndex,
    pub queued_bytes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// Queue went from empty to non-empty.
    FirstBufferRcvd,
    /// Queue drained to empty.
    BufferEmpty,
}

/// MAC asks the LLC for packets to fill a transmit opportunity.
#[derive(Debug)]
pub struct TxOpportunityReq {
    pub handle: u64,
    pub rc_index: RcIndex,
    pub bytes_max: u32,
    pub job: TxJob,
}

/// LLC answers a [`TxOpportunityReq`] with the dequeued packets. The job is
/// returned unchanged so the MAC can resume the right transmission context.
#[derive(Debug)]
pub struct TxOpportunityCnf {
    pub handle: u64,
    pub packets: Vec<MacPacket>,
    pub queued_bytes_left: u32,
    pub job: TxJob,
}

/// Purpose of a transmit opportunity round trip.
#[derive(Debug, Clone)]
pub enum TxJob {
    /// Fill a demand-assigned slot that is firing now.
    Da(DaTxJob),
    /// Prefetch one payload for a CRDSA block under evaluation.
    CrdsaPayload { channel_id: ChannelId },
    /// Fill an ESSA burst that is firing now.
    Essa(EssaTxJob),
}
