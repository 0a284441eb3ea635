//! Service primitives exchanged between the entities of the terminal stack.
//!
//! Everything that crosses an entity boundary travels as a [`SapMsg`] through
//! the message router. The inner payload types are grouped per service access
//! point: PHY (bursts and forward-link signaling), LLC (queue events and
//! transmit opportunities), RM (capacity requests) and the timer primitives
//! the entities schedule for themselves.

pub mod llc;
pub mod phy;
pub mod rm;
pub mod sapmsg;
pub mod timer;

pub use sapmsg::*;
