pub mod entity_trait;
pub mod llc;
pub mod mac;
pub mod messagerouter;
pub mod ncc;
pub mod phy;
pub mod rm;

// Re-export commonly used items from router
pub use entity_trait::SatEntityTrait;
pub use messagerouter::{EventHandle, MessagePrio, MessageQueue, MessageRouter};
