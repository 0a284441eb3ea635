use sat_pdus::CtrlMsg;

/// MAC tells the request manager how many bytes the latest TBTP granted
/// per request class. Indexed by request class.
#[derive(Debug)]
pub struct ResourceAssignInd {
    pub bytes_per_rc: Vec<u32>,
}

/// Request manager asks the MAC to transmit a control message on the
/// return link, e.g. a capacity request.
#[derive(Debug)]
pub struct CtrlMsgReq {
    pub msg: CtrlMsg,
}
