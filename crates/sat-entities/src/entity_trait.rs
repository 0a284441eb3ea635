use as_any::AsAny;
use sat_core::sat_entities::SatEntity;
use sat_config::SharedConfig;
use sat_saps::SapMsg;
use crate::MessageQueue;

/// Trait for stack entities
/// Used by MessageRouter for passing messages between entities
pub trait SatEntityTrait: Send + AsAny {
    /// Returns the entity type identifier
    fn entity(&self) -> SatEntity;

    /// Handle incoming SAP primitive
    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg);

    /// Update configuration (optional)
    #[allow(dead_code)]
    fn set_config(&mut self, _config: SharedConfig) {}

    /// Called once before the event loop starts, lets an entity schedule
    /// its initial timers
    fn start(&mut self, _queue: &mut MessageQueue) {}
}
