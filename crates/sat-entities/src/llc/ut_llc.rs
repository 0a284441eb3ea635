use tracing::{debug, trace, warn};

use sat_config::terminal_config::SharedConfig;
use sat_core::sat_common::Sap;
use sat_core::sat_entities::SatEntity;
use sat_saps::llc::{QueueEvent, QueueEventInd, TxOpportunityCnf};
use sat_saps::phy::{MacPacket, PacketKind};
use sat_saps::{SapMsg, SapMsgInner};

use crate::entity_trait::SatEntityTrait;
use crate::llc::llc_queues::LlcQueues;
use crate::messagerouter::MessageQueue;

/// Return-link LLC of the user terminal.
///
/// Keeps one byte-count queue per request class, notifies the MAC and the
/// request manager about buffer state transitions and hands out packets
/// when the MAC opens a transmit opportunity.
pub struct UtLlc {
    self_component: SatEntity,
    config: SharedConfig,
    queues: LlcQueues,
}

impl UtLlc {
    pub fn new(config: SharedConfig) -> Self {
        let cfg = config.config();
        let queues = LlcQueues::new(usize::from(cfg.llc.rc_count), cfg.llc.max_queue_bytes);
        UtLlc {
            self_component: SatEntity::Llc,
            config,
            queues,
        }
    }

    pub fn queues(&self) -> &LlcQueues {
        &self.queues
    }

    /// Reports a buffer state transition to the MAC and the request manager.
    fn send_queue_event(
        &self,
        queue: &mut MessageQueue,
        event: QueueEvent,
        rc_index: u8,
        queued_bytes: u32,
    ) {
        for dest in [SatEntity::Mac, SatEntity::Rm] {
            let m = SapMsg {
                sap: Sap::LlcSap,
                src: self.self_component,
                dest,
                t_submit: queue.now(),
                msg: SapMsgInner::QueueEventInd(QueueEventInd {
                    event,
                    rc_index,
                    queued_bytes,
                }),
            };
            queue.push_back(m);
        }
    }

    fn rx_llc_enqueue_req(&mut self, queue: &mut MessageQueue, message: &mut SapMsg) {
        let SapMsgInner::LlcEnqueueReq(prim) = &message.msg else {
            panic!("Expected LlcEnqueueReq!");
        };
        trace!("rx_llc_enqueue_req: {:?}", prim);

        let rc = prim.rc_index as usize;
        if rc >= self.queues.rc_count() {
            warn!(
                "Enqueue for unknown request class {} dropped ({} bytes)",
                prim.rc_index, prim.bytes
            );
            return;
        }

        let outcome = self.queues.enqueue(rc, prim.bytes);
        if outcome.dropped > 0 {
            warn!(
                "Queue rc {} full, dropped {} of {} bytes",
                prim.rc_index, outcome.dropped, prim.bytes
            );
        }
        debug!(
            "Enqueued {} bytes on rc {}, {} queued",
            outcome.accepted,
            prim.rc_index,
            self.queues.queued_bytes(rc)
        );

        if outcome.first {
            self.send_queue_event(
                queue,
                QueueEvent::FirstBufferRcvd,
                prim.rc_index,
                self.queues.queued_bytes(rc),
            );
        }
    }

    fn rx_tx_opportunity_req(&mut self, queue: &mut MessageQueue, message: &mut SapMsg) {
        let SapMsgInner::TxOpportunityReq(prim) = &message.msg else {
            panic!("Expected TxOpportunityReq!");
        };
        trace!("rx_tx_opportunity_req: {:?}", prim);

        let rc = prim.rc_index as usize;
        assert!(rc < self.queues.rc_count(), "Opportunity for unknown rc {}", rc);

        let out = self.queues.dequeue(rc, prim.bytes_max);
        let mut packets = Vec::new();
        if out.taken > 0 {
            packets.push(MacPacket {
                kind: PacketKind::Data,
                len_bytes: out.taken,
                rc_index: prim.rc_index,
            });
        }
        debug!(
            "Tx opportunity on rc {}: {} of max {} bytes, {} left",
            prim.rc_index, out.taken, prim.bytes_max, out.queued_left
        );

        let m = SapMsg {
            sap: Sap::LlcSap,
            src: self.self_component,
            dest: message.src,
            t_submit: queue.now(),
            msg: SapMsgInner::TxOpportunityCnf(TxOpportunityCnf {
                handle: prim.handle,
                packets,
                queued_bytes_left: out.queued_left,
                job: prim.job.clone(),
            }),
        };
        queue.push_back(m);

        // The confirm goes out first so the requester sees the packets
        // before the buffer state update.
        if out.emptied {
            self.send_queue_event(queue, QueueEvent::BufferEmpty, prim.rc_index, 0);
        }
    }

    fn rx_llc_prim(&mut self, queue: &mut MessageQueue, message: &mut SapMsg) {
        match &message.msg {
            SapMsgInner::LlcEnqueueReq(_) => self.rx_llc_enqueue_req(queue, message),
            SapMsgInner::TxOpportunityReq(_) => self.rx_tx_opportunity_req(queue, message),
            _ => panic!("Unhandled LLC-SAP prim {}", message.msg),
        }
    }
}

impl SatEntityTrait for UtLlc {
    fn entity(&self) -> SatEntity {
        self.self_component
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, mut message: SapMsg) {
        match message.sap {
            Sap::LlcSap => self.rx_llc_prim(queue, &mut message),
            _ => panic!("LLC cannot handle {:?} prims", message.sap),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use sat_config::terminal_config::TerminalConfig;
    use sat_saps::llc::{LlcEnqueueReq, TxJob, TxOpportunityReq};
    use sat_saps::timer::DaTxJob;
    use sat_core::sim_time::SimTime;

    fn test_llc() -> UtLlc {
        let mut cfg = TerminalConfig::new(7);
        cfg.llc.rc_count = 3;
        cfg.llc.max_queue_bytes = 10_000;
        UtLlc::new(SharedConfig::from_config(cfg))
    }

    fn enqueue_msg(rc_index: u8, bytes: u32) -> SapMsg {
        SapMsg {
            sap: Sap::LlcSap,
            src: SatEntity::Llc,
            dest: SatEntity::Llc,
            t_submit: SimTime::ZERO,
            msg: SapMsgInner::LlcEnqueueReq(LlcEnqueueReq { rc_index, bytes }),
        }
    }

    fn opportunity_msg(rc_index: u8, bytes_max: u32) -> SapMsg {
        SapMsg {
            sap: Sap::LlcSap,
            src: SatEntity::Mac,
            dest: SatEntity::Llc,
            t_submit: SimTime::ZERO,
            msg: SapMsgInner::TxOpportunityReq(TxOpportunityReq {
                handle: 1,
                rc_index,
                bytes_max,
                job: TxJob::Da(DaTxJob {
                    carrier_id: 1,
                    duration: SimTime::from_micros(500),
                    waveform_id: 3,
                    rc_index,
                    payload_bytes: bytes_max,
                }),
            }),
        }
    }

    fn drain(queue: &mut MessageQueue) -> Vec<SapMsg> {
        let mut out = Vec::new();
        while let Some(m) = queue.pop_front() {
            out.push(m);
        }
        out
    }

    #[test]
    fn first_enqueue_notifies_mac_and_rm() {
        let mut llc = test_llc();
        let mut queue = MessageQueue::default();

        llc.rx_prim(&mut queue, enqueue_msg(1, 400));
        let msgs = drain(&mut queue);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].dest, SatEntity::Mac);
        assert_eq!(msgs[1].dest, SatEntity::Rm);
        for m in &msgs {
            let SapMsgInner::QueueEventInd(ind) = &m.msg else {
                panic!("expected QueueEventInd");
            };
            assert_eq!(ind.event, QueueEvent::FirstBufferRcvd);
            assert_eq!(ind.rc_index, 1);
            assert_eq!(ind.queued_bytes, 400);
        }

        // A second enqueue on a non-empty queue is silent
        llc.rx_prim(&mut queue, enqueue_msg(1, 100));
        assert!(drain(&mut queue).is_empty());
    }

    #[test]
    fn opportunity_returns_packets_then_empty_event() {
        let mut llc = test_llc();
        let mut queue = MessageQueue::default();
        llc.rx_prim(&mut queue, enqueue_msg(2, 300));
        drain(&mut queue);

        llc.rx_prim(&mut queue, opportunity_msg(2, 500));
        let msgs = drain(&mut queue);
        assert_eq!(msgs.len(), 3);

        let SapMsgInner::TxOpportunityCnf(cnf) = &msgs[0].msg else {
            panic!("expected TxOpportunityCnf first");
        };
        assert_eq!(cnf.handle, 1);
        assert_eq!(cnf.packets.len(), 1);
        assert_eq!(cnf.packets[0].len_bytes, 300);
        assert_eq!(cnf.queued_bytes_left, 0);

        let SapMsgInner::QueueEventInd(ind) = &msgs[1].msg else {
            panic!("expected QueueEventInd after the confirm");
        };
        assert_eq!(ind.event, QueueEvent::BufferEmpty);
    }

    #[test]
    fn partial_drain_leaves_backlog_and_no_empty_event() {
        let mut llc = test_llc();
        let mut queue = MessageQueue::default();
        llc.rx_prim(&mut queue, enqueue_msg(0, 900));
        drain(&mut queue);

        llc.rx_prim(&mut queue, opportunity_msg(0, 500));
        let msgs = drain(&mut queue);
        assert_eq!(msgs.len(), 1);
        let SapMsgInner::TxOpportunityCnf(cnf) = &msgs[0].msg else {
            panic!("expected TxOpportunityCnf");
        };
        assert_eq!(cnf.packets[0].len_bytes, 500);
        assert_eq!(cnf.queued_bytes_left, 400);
        assert_eq!(llc.queues().queued_bytes(0), 400);
    }

    #[test]
    fn empty_queue_confirms_with_no_packets() {
        let mut llc = test_llc();
        let mut queue = MessageQueue::default();

        llc.rx_prim(&mut queue, opportunity_msg(1, 500));
        let msgs = drain(&mut queue);
        assert_eq!(msgs.len(), 1);
        let SapMsgInner::TxOpportunityCnf(cnf) = &msgs[0].msg else {
            panic!("expected TxOpportunityCnf");
        };
        assert!(cnf.packets.is_empty());
        assert_eq!(cnf.queued_bytes_left, 0);
    }
}
