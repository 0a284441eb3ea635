use sat_core::sat_entities::SatEntity;
use sat_entities::entity_trait::SatEntityTrait;
use sat_entities::messagerouter::MessageQueue;
use sat_saps::sapmsg::SapMsg;

/// Stand-in entity that records every primitive delivered to it.
pub struct Sink {
    component: SatEntity,
    msgqueue: Vec<SapMsg>,
}

impl Sink {
    pub fn new(component: SatEntity) -> Self {
        Sink {
            component,
            msgqueue: Vec::new(),
        }
    }

    pub fn take_msgqueue(&mut self) -> Vec<SapMsg> {
        std::mem::take(&mut self.msgqueue)
    }
}

impl SatEntityTrait for Sink {
    fn entity(&self) -> SatEntity {
        self.component
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: SapMsg) {
        self.msgqueue.push(message);
    }
}
