use std::collections::HashMap;

use sat_config::{AllocationChannelConfig, CfgFrame, CfgNcc, SharedConfig, TerminalConfig};
use sat_core::sat_entities::SatEntity;
use sat_core::SimTime;
use sat_entities::entity_trait::SatEntityTrait;
use sat_entities::llc::UtLlc;
use sat_entities::mac::handover::ScriptedBeamAuthority;
use sat_entities::mac::UtMac;
use sat_entities::messagerouter::MessageRouter;
use sat_entities::ncc::NccSim;
use sat_entities::phy::UserPhy;
use sat_entities::rm::RequestManager;
use sat_saps::sapmsg::SapMsg;

use crate::common::sink::Sink;

/// Small timing plan for component tests: two 50 ms frames of 10 slots,
/// channel 0 carries contention traffic, channel 1 carries logon bursts.
pub fn default_test_config() -> TerminalConfig {
    let mut config = TerminalConfig::new(1);
    config.sim.seed = Some(7);
    config.superframe.frames = vec![
        CfgFrame {
            duration: SimTime::from_millis(50),
            slot_count: 10,
        },
        CfgFrame {
            duration: SimTime::from_millis(50),
            slot_count: 10,
        },
    ];
    config.ra_channels = vec![
        AllocationChannelConfig {
            channel_id: 0,
            frame_index: 0,
            crdsa_allowed: true,
            crdsa_min_randomization_value: 0,
            crdsa_max_randomization_value: 9,
            ..Default::default()
        },
        AllocationChannelConfig {
            channel_id: 1,
            frame_index: 1,
            crdsa_min_randomization_value: 0,
            crdsa_max_randomization_value: 9,
            ..Default::default()
        },
    ];
    config.mac.logon_channel = 1;
    config.ncc = Some(CfgNcc {
        logon_response_delay: SimTime::from_millis(20),
        tbtp_interval_superframes: 1,
        slots_per_tbtp: 2,
        bytes_per_slot: 400,
    });
    config
}

pub struct ComponentTest {
    pub config: SharedConfig,
    pub router: MessageRouter,
    pub sinks: Vec<SatEntity>,
}

impl ComponentTest {
    pub fn new(config: TerminalConfig) -> Self {
        let config = SharedConfig::from_config(config);
        let router = MessageRouter::new(config.clone());
        ComponentTest {
            config,
            router,
            sinks: Vec::new(),
        }
    }

    /// Instantiates the named entities with the shared test config and
    /// registers message-recording sinks in place of the remaining ones.
    pub fn populate_entities(&mut self, components: Vec<SatEntity>, sinks: Vec<SatEntity>) {
        for component in components {
            match component {
                SatEntity::Phy => self.register_entity(UserPhy::new(self.config.clone())),
                SatEntity::Llc => self.register_entity(UtLlc::new(self.config.clone())),
                SatEntity::Mac => {
                    let cfg = self.config.config();
                    let authority = ScriptedBeamAuthority::new(
                        cfg.mac.initial_beam_id,
                        cfg.handover.target_beam,
                        cfg.handover.degrade_after,
                    );
                    self.register_entity(UtMac::new(self.config.clone(), Box::new(authority)));
                }
                SatEntity::Rm => self.register_entity(RequestManager::new(self.config.clone())),
                SatEntity::Ncc => self.register_entity(NccSim::new(self.config.clone())),
            }
        }
        self.create_sinks(sinks);
    }

    pub fn create_sinks(&mut self, sinks: Vec<SatEntity>) {
        for sink in sinks {
            assert!(!self.sinks.contains(&sink), "Sink already exists");
            assert!(
                self.router.get_entity(sink).is_none(),
                "Entity {:?} already registered",
                sink
            );
            self.router.register_entity(Box::new(Sink::new(sink)));
            self.sinks.push(sink);
        }
    }

    pub fn register_entity<T: SatEntityTrait + 'static>(&mut self, entity: T) {
        self.router.register_entity(Box::new(entity));
    }

    pub fn submit_message(&mut self, message: SapMsg) {
        self.router.submit_message(message);
    }

    pub fn deliver_all_messages(&mut self) {
        self.router.deliver_all_messages();
    }

    pub fn run_stack(&mut self, until: Option<SimTime>) {
        self.router.run_stack(until, None);
    }

    /// Typed access to a registered entity, panics on a bad downcast.
    pub fn entity<T: SatEntityTrait + 'static>(&mut self, component: SatEntity) -> &T {
        self.router
            .get_entity(component)
            .unwrap()
            .as_any()
            .downcast_ref::<T>()
            .unwrap()
    }

    pub fn dump_sinks(&mut self) -> HashMap<SatEntity, Vec<SapMsg>> {
        let mut dump = HashMap::new();
        for sink in self.sinks.clone() {
            let entity = self.router.get_entity(sink).unwrap();
            let sink_entity = entity.as_any_mut().downcast_mut::<Sink>().unwrap();
            dump.insert(sink, sink_entity.take_msgqueue());
        }
        dump
    }
}
