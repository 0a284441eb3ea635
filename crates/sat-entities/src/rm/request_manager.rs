use tracing::{debug, info, trace};

use sat_config::terminal_config::SharedConfig;
use sat_core::sat_common::Sap;
use sat_core::sat_entities::SatEntity;
use sat_core::sim_time::SimTime;
use sat_pdus::capacity_request::{CapacityRequest, CapacityRequestEntry};
use sat_pdus::ctrl_msg::CtrlMsg;
use sat_saps::rm::CtrlMsgReq;
use sat_saps::timer::RmTimerInd;
use sat_saps::{SapMsg, SapMsgInner};

use crate::entity_trait::SatEntityTrait;
use crate::messagerouter::MessageQueue;

/// Demand evaluation for the return link.
///
/// Mirrors the LLC buffer state and periodically turns outstanding backlog
/// into capacity requests towards the NCC. Bytes already assigned through
/// the TBTP are deducted so the same demand is not signaled twice.
pub struct RequestManager {
    self_component: SatEntity,
    config: SharedConfig,
    enabled: bool,
    evaluation_interval: SimTime,
    backlog: Vec<u32>,
    granted_since_eval: Vec<u32>,
    requests_sent: u64,
}

impl RequestManager {
    pub fn new(config: SharedConfig) -> Self {
        let cfg = config.config();
        let rc_count = usize::from(cfg.llc.rc_count);
        RequestManager {
            self_component: SatEntity::Rm,
            enabled: cfg.rm.enabled,
            evaluation_interval: cfg.rm.evaluation_interval,
            backlog: vec![0; rc_count],
            granted_since_eval: vec![0; rc_count],
            requests_sent: 0,
            config,
        }
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    fn schedule_evaluation(&self, queue: &mut MessageQueue) {
        let at = queue.now() + self.evaluation_interval;
        let m = SapMsg {
            sap: Sap::TimerSap,
            src: self.self_component,
            dest: self.self_component,
            t_submit: queue.now(),
            msg: SapMsgInner::RmTimerInd(RmTimerInd {}),
        };
        queue.schedule_at(at, m);
    }

    fn rx_queue_event_ind(&mut self, message: &mut SapMsg) {
        let SapMsgInner::QueueEventInd(prim) = &message.msg else {
            panic!("Expected QueueEventInd!");
        };
        trace!("rx_queue_event_ind: {:?}", prim);

        let rc = prim.rc_index as usize;
        if rc < self.backlog.len() {
            self.backlog[rc] = prim.queued_bytes;
        }
    }

    fn rx_resource_assign_ind(&mut self, message: &mut SapMsg) {
        let SapMsgInner::ResourceAssignInd(prim) = &message.msg else {
            panic!("Expected ResourceAssignInd!");
        };
        trace!("rx_resource_assign_ind: {:?}", prim);

        for (rc, bytes) in prim.bytes_per_rc.iter().enumerate() {
            if rc < self.granted_since_eval.len() {
                self.granted_since_eval[rc] =
                    self.granted_since_eval[rc].saturating_add(*bytes);
            }
        }
    }

    fn rx_rm_timer_ind(&mut self, queue: &mut MessageQueue) {
        trace!("rx_rm_timer_ind");

        self.evaluate(queue);
        self.schedule_evaluation(queue);
    }

    /// Signals still-unserved backlog to the NCC, via the MAC.
    fn evaluate(&mut self, queue: &mut MessageQueue) {
        if !self.config.state_read().logged_on {
            debug!("Not logged on, skipping demand evaluation");
            return;
        }

        let mut entries = Vec::new();
        for rc in 0..self.backlog.len() {
            let need = self.backlog[rc].saturating_sub(self.granted_since_eval[rc]);
            if need > 0 {
                entries.push(CapacityRequestEntry {
                    rc_index: rc as u8,
                    requested_bytes: need,
                });
            }
        }
        self.granted_since_eval.fill(0);

        if entries.is_empty() {
            trace!("No unserved backlog");
            return;
        }

        let request = CapacityRequest {
            terminal_id: self.config.config().terminal_id,
            requests: entries,
        };
        info!("Requesting capacity: {:?}", request.requests);
        self.requests_sent += 1;

        let m = SapMsg {
            sap: Sap::RmSap,
            src: self.self_component,
            dest: SatEntity::Mac,
            t_submit: queue.now(),
            msg: SapMsgInner::CtrlMsgReq(CtrlMsgReq {
                msg: CtrlMsg::CapacityRequest(request),
            }),
        };
        queue.push_back(m);
    }

    fn rx_llc_prim(&mut self, message: &mut SapMsg) {
        match &message.msg {
            SapMsgInner::QueueEventInd(_) => self.rx_queue_event_ind(message),
            _ => panic!("Unhandled LLC-SAP prim {}", message.msg),
        }
    }

    fn rx_rm_prim(&mut self, message: &mut SapMsg) {
        match &message.msg {
            SapMsgInner::ResourceAssignInd(_) => self.rx_resource_assign_ind(message),
            _ => panic!("Unhandled RM-SAP prim {}", message.msg),
        }
    }

    fn rx_timer_prim(&mut self, queue: &mut MessageQueue, message: &mut SapMsg) {
        match &message.msg {
            SapMsgInner::RmTimerInd(_) => self.rx_rm_timer_ind(queue),
            _ => panic!("Unhandled Timer-SAP prim {}", message.msg),
        }
    }
}

impl SatEntityTrait for RequestManager {
    fn entity(&self) -> SatEntity {
        self.self_component
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn start(&mut self, queue: &mut MessageQueue) {
        if self.enabled {
            self.schedule_evaluation(queue);
        }
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, mut message: SapMsg) {
        match message.sap {
            Sap::LlcSap => self.rx_llc_prim(&mut message),
            Sap::RmSap => self.rx_rm_prim(&mut message),
            Sap::TimerSap => self.rx_timer_prim(queue, &mut message),
            _ => panic!("RM cannot handle {:?} prims", message.sap),
        }
    }
}
