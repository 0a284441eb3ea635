use std::fmt;

use sat_core::sat_common::Sap;
use sat_core::sat_entities::SatEntity;
use sat_core::SimTime;

use crate::llc::{LlcEnqueueReq, QueueEventInd, TxOpportunityCnf, TxOpportunityReq};
use crate::phy::{PhyConfigureReq, PhyRxInd, PhySignalingInd, PhyTxReq};
use crate::rm::{CtrlMsgReq, ResourceAssignInd};
use crate::timer::{MacTimerInd, NccTimerInd, RmTimerInd};

/// A message passed between two entities over a service access point.
#[derive(Debug)]
pub struct SapMsg {
    pub sap: Sap,
    pub src: SatEntity,
    pub dest: SatEntity,
    /// Simulated time at which the message was submitted.
    pub t_submit: SimTime,
    pub msg: SapMsgInner,
}

impl SapMsg {
    pub fn new(sap: Sap, src: SatEntity, dest: SatEntity, t_submit: SimTime, msg: SapMsgInner) -> SapMsg {
        SapMsg {
            sap,
            src,
            dest,
            t_submit,
            msg,
        }
    }

    pub fn get_source(&self) -> SatEntity {
        self.src
    }

    pub fn get_dest(&self) -> SatEntity {
        self.dest
    }

    pub fn get_sap(&self) -> Sap {
        self.sap
    }
}

#[derive(Debug)]
pub enum SapMsgInner {
    // PHY-SAP
    PhyTxReq(PhyTxReq),
    PhyRxInd(PhyRxInd),
    PhySignalingInd(PhySignalingInd),
    PhyConfigureReq(PhyConfigureReq),

    // LLC-SAP
    LlcEnqueueReq(LlcEnqueueReq),
    QueueEventInd(QueueEventInd),
    TxOpportunityReq(TxOpportunityReq),
    TxOpportunityCnf(TxOpportunityCnf),

    // RM-SAP
    ResourceAssignInd(ResourceAssignInd),
    CtrlMsgReq(CtrlMsgReq),

    // Timer-SAP
    MacTimerInd(MacTimerInd),
    RmTimerInd(RmTimerInd),
    NccTimerInd(NccTimerInd),
}

impl fmt::Display for SapMsgInner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SapMsgInner::PhyTxReq(_) => "PhyTxReq",
            SapMsgInner::PhyRxInd(_) => "PhyRxInd",
            SapMsgInner::PhySignalingInd(_) => "PhySignalingInd",
            SapMsgInner::PhyConfigureReq(_) => "PhyConfigureReq",
            SapMsgInner::LlcEnqueueReq(_) => "LlcEnqueueReq",
            SapMsgInner::QueueEventInd(_) => "QueueEventInd",
            SapMsgInner::TxOpportunityReq(_) => "TxOpportunityReq",
            SapMsgInner::TxOpportunityCnf(_) => "TxOpportunityCnf",
            SapMsgInner::ResourceAssignInd(_) => "ResourceAssignInd",
            SapMsgInner::CtrlMsgReq(_) => "CtrlMsgReq",
            SapMsgInner::MacTimerInd(_) => "MacTimerInd",
            SapMsgInner::RmTimerInd(_) => "RmTimerInd",
            SapMsgInner::NccTimerInd(_) => "NccTimerInd",
        };
        write!(f, "{}", name)
    }
}
