use tracing::{debug, info, trace};

use sat_config::terminal_config::SharedConfig;
use sat_core::sat_common::{BeamId, Sap};
use sat_core::sat_entities::SatEntity;
use sat_saps::phy::{PhyRxInd, TxAccessMode};
use sat_saps::{SapMsg, SapMsgInner};

use crate::entity_trait::SatEntityTrait;
use crate::messagerouter::MessageQueue;

/// Transmit side counters, kept for the end-of-run summary.
#[derive(Debug, Default, Clone)]
pub struct PhyStats {
    pub da_bursts: u64,
    pub slotted_aloha_bursts: u64,
    pub crdsa_bursts: u64,
    pub essa_bursts: u64,
    pub logon_bursts: u64,
    pub tx_bytes: u64,
    pub signaling_rx: u64,
}

/// Return-link PHY of the user terminal.
///
/// There is no signal model here. Bursts from the MAC are carried to the
/// NCC unchanged and forward-link signaling is carried back up, so the
/// timing behavior of the MAC stays the observable quantity.
pub struct UserPhy {
    self_component: SatEntity,
    config: SharedConfig,
    beam_id: BeamId,
    stats: PhyStats,
}

impl UserPhy {
    pub fn new(config: SharedConfig) -> Self {
        let beam_id = config.config().mac.initial_beam_id;
        UserPhy {
            self_component: SatEntity::Phy,
            config,
            beam_id,
            stats: PhyStats::default(),
        }
    }

    pub fn beam_id(&self) -> BeamId {
        self.beam_id
    }

    pub fn stats(&self) -> &PhyStats {
        &self.stats
    }

    fn rx_phy_tx_req(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::PhyTxReq(prim) = message.msg else {
            panic!("Expected PhyTxReq!");
        };
        trace!("rx_phy_tx_req: {:?}", prim);

        let burst = prim.burst;
        self.stats.tx_bytes += u64::from(burst.total_bytes());
        match burst.access {
            TxAccessMode::Da => self.stats.da_bursts += 1,
            TxAccessMode::SlottedAloha => self.stats.slotted_aloha_bursts += 1,
            TxAccessMode::Crdsa => self.stats.crdsa_bursts += 1,
            TxAccessMode::Essa => self.stats.essa_bursts += 1,
            TxAccessMode::Logon => self.stats.logon_bursts += 1,
        }
        debug!(
            "Radiating {:?} burst on beam {}, {} bytes",
            burst.access,
            self.beam_id,
            burst.total_bytes()
        );

        let m = SapMsg {
            sap: Sap::PhySap,
            src: self.self_component,
            dest: SatEntity::Ncc,
            t_submit: queue.now(),
            msg: SapMsgInner::PhyRxInd(PhyRxInd { burst }),
        };
        queue.push_back(m);
    }

    fn rx_phy_signaling_ind(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::PhySignalingInd(prim) = message.msg else {
            panic!("Expected PhySignalingInd!");
        };
        trace!("rx_phy_signaling_ind: {}", prim.msg);

        self.stats.signaling_rx += 1;
        let m = SapMsg {
            sap: Sap::PhySap,
            src: self.self_component,
            dest: SatEntity::Mac,
            t_submit: queue.now(),
            msg: SapMsgInner::PhySignalingInd(prim),
        };
        queue.push_back(m);
    }

    fn rx_phy_configure_req(&mut self, message: SapMsg) {
        let SapMsgInner::PhyConfigureReq(prim) = message.msg else {
            panic!("Expected PhyConfigureReq!");
        };
        trace!("rx_phy_configure_req: {:?}", prim);

        info!("Retuning from beam {} to beam {}", self.beam_id, prim.beam_id);
        self.beam_id = prim.beam_id;
    }

    fn rx_phy_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match &message.msg {
            SapMsgInner::PhyTxReq(_) => self.rx_phy_tx_req(queue, message),
            SapMsgInner::PhySignalingInd(_) => self.rx_phy_signaling_ind(queue, message),
            SapMsgInner::PhyConfigureReq(_) => self.rx_phy_configure_req(message),
            _ => panic!("Unhandled PHY-SAP prim {}", message.msg),
        }
    }
}

impl SatEntityTrait for UserPhy {
    fn entity(&self) -> SatEntity {
        self.self_component
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.sap {
            Sap::PhySap => self.rx_phy_prim(queue, message),
            _ => panic!("PHY cannot handle {:?} prims", message.sap),
        }
    }
}
