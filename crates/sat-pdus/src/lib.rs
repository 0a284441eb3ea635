//! Signaling messages exchanged between the terminal and the network
//! control centre.
//!
//! These are abstract typed messages, not wire formats: the return link
//! model treats signaling content as already decoded. Sizes are carried
//! explicitly where the MAC needs them for capacity accounting.

pub mod capacity_request;
pub mod ctrl_msg;
pub mod handover_recommendation;
pub mod logon;
pub mod tbtp;
pub mod timu;

pub use capacity_request::*;
pub use ctrl_msg::*;
pub use handover_recommendation::*;
pub use logon::*;
pub use tbtp::*;
pub use timu::*;
