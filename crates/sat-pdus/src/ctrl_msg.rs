use core::fmt::Display;

use crate::capacity_request::CapacityRequest;
use crate::handover_recommendation::HandoverRecommendation;
use crate::logon::{LogonRequest, LogonResponse};
use crate::tbtp::TbtpMessage;
use crate::timu::TimuMessage;

/// Exhaustive list of signaling messages crossing the air interface.
#[derive(Debug, Clone, PartialEq)]
pub enum CtrlMsg {
    // Terminal -> network
    CapacityRequest(CapacityRequest),
    HandoverRecommendation(HandoverRecommendation),
    LogonRequest(LogonRequest),

    // Network -> terminal
    Tbtp(TbtpMessage),
    LogonResponse(LogonResponse),
    Timu(TimuMessage),
}

impl CtrlMsg {
    /// Size on the air, for return-link capacity accounting.
    /// Network-originated messages travel on the forward link, which is
    /// not capacity-modeled, so they account as zero.
    pub fn len_bytes(&self) -> u32 {
        match self {
            CtrlMsg::CapacityRequest(cr) => cr.len_bytes(),
            CtrlMsg::HandoverRecommendation(hr) => hr.len_bytes(),
            CtrlMsg::LogonRequest(lr) => lr.len_bytes(),
            CtrlMsg::Tbtp(_) | CtrlMsg::LogonResponse(_) | CtrlMsg::Timu(_) => 0,
        }
    }
}

impl Display for CtrlMsg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CtrlMsg::CapacityRequest(_) => write!(f, "CapacityRequest"),
            CtrlMsg::HandoverRecommendation(_) => write!(f, "HandoverRecommendation"),
            CtrlMsg::LogonRequest(_) => write!(f, "LogonRequest"),
            CtrlMsg::Tbtp(_) => write!(f, "Tbtp"),
            CtrlMsg::LogonResponse(_) => write!(f, "LogonResponse"),
            CtrlMsg::Timu(_) => write!(f, "Timu"),
        }
    }
}
