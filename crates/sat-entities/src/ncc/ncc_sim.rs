use std::collections::{HashMap, HashSet};

use tracing::{debug, info, trace, warn};

use sat_config::terminal_config::{CfgNcc, SharedConfig};
use sat_core::assert_warn;
use sat_core::sat_common::{BeamId, CarrierId, GwAddress, RcIndex, Sap, TerminalId};
use sat_core::sat_entities::SatEntity;
use sat_core::sim_time::SimTime;
use sat_core::superframe::SuperframeSeq;
use sat_pdus::ctrl_msg::CtrlMsg;
use sat_pdus::logon::LogonResponse;
use sat_pdus::tbtp::{TbtpEntry, TbtpMessage, TbtpTimeSlotInfo};
use sat_pdus::timu::TimuMessage;
use sat_saps::phy::{PacketKind, PhySignalingInd, TxAccessMode};
use sat_saps::timer::{NccTimer, NccTimerInd};
use sat_saps::{SapMsg, SapMsgInner};

use crate::entity_trait::SatEntityTrait;
use crate::messagerouter::MessageQueue;

const RETURN_LINK_SEQ: u8 = 0;

const DA_CARRIER_ID: CarrierId = 1;
const DA_WAVEFORM_ID: u8 = 3;

pub fn gw_address_for_beam(beam_id: BeamId) -> GwAddress {
    0xAA00_0000 + u64::from(beam_id)
}

/// Receive side counters, kept for the end-of-run summary.
#[derive(Debug, Default, Clone)]
pub struct NccStats {
    pub bursts_received: u64,
    pub data_bytes_received: u64,
    pub crdsa_replicas_received: u64,
    pub logon_requests_received: u64,
    pub capacity_requests_received: u64,
    pub recommendations_received: u64,
    pub tbtps_sent: u64,
}

/// Minimal hub-side model closing the control loops of the terminal.
///
/// Answers logon requests after a fixed delay, converts handover
/// recommendations into TIM-U switch orders and emits a periodic TBTP
/// granting demand-assigned slots against signaled capacity requests.
/// There is no collision or channel model, every burst is received.
pub struct NccSim {
    self_component: SatEntity,
    config: SharedConfig,
    ncc: CfgNcc,
    seq: SuperframeSeq,
    logged_on: Vec<TerminalId>,
    /// Outstanding signaled demand in bytes, per terminal and request class.
    demand: HashMap<(TerminalId, RcIndex), u64>,
    /// CRDSA packet ids already decoded, replicas of these carry no new data.
    crdsa_seen: HashSet<u32>,
    stats: NccStats,
}

impl NccSim {
    pub fn new(config: SharedConfig) -> Self {
        let cfg = config.config();
        let ncc = cfg.ncc.clone().unwrap_or_default();
        let seq = match cfg.superframe_seq() {
            Ok(seq) => seq,
            Err(e) => panic!("Invalid superframe configuration: {:?}", e),
        };
        NccSim {
            self_component: SatEntity::Ncc,
            config,
            ncc,
            seq,
            logged_on: Vec::new(),
            demand: HashMap::new(),
            crdsa_seen: HashSet::new(),
            stats: NccStats::default(),
        }
    }

    pub fn stats(&self) -> &NccStats {
        &self.stats
    }

    pub fn logged_terminals(&self) -> &[TerminalId] {
        &self.logged_on
    }

    pub fn unique_crdsa_packets(&self) -> usize {
        self.crdsa_seen.len()
    }

    fn timer_msg(&self, now: SimTime, kind: NccTimer) -> SapMsg {
        SapMsg {
            sap: Sap::TimerSap,
            src: self.self_component,
            dest: self.self_component,
            t_submit: now,
            msg: SapMsgInner::NccTimerInd(NccTimerInd { kind }),
        }
    }

    fn send_signaling(&self, queue: &mut MessageQueue, msg: CtrlMsg) {
        let m = SapMsg {
            sap: Sap::PhySap,
            src: self.self_component,
            dest: SatEntity::Phy,
            t_submit: queue.now(),
            msg: SapMsgInner::PhySignalingInd(PhySignalingInd { msg }),
        };
        queue.push_back(m);
    }

    fn rx_logon_request(&mut self, queue: &mut MessageQueue, terminal_id: TerminalId) {
        self.stats.logon_requests_received += 1;
        if !self.logged_on.contains(&terminal_id) {
            self.logged_on.push(terminal_id);
            info!("Terminal {} admitted", terminal_id);
        }

        let response = CtrlMsg::LogonResponse(LogonResponse {
            terminal_id,
            assigned_ra_channel: self.config.config().mac.assigned_ra_channel,
        });
        // The delay stands in for forward link propagation and hub processing
        let at = queue.now() + self.ncc.logon_response_delay;
        let m = self.timer_msg(queue.now(), NccTimer::Forward(response));
        queue.schedule_at(at, m);
    }

    fn process_control(&mut self, queue: &mut MessageQueue, msg: &CtrlMsg) {
        match msg {
            CtrlMsg::LogonRequest(req) => self.rx_logon_request(queue, req.terminal_id),
            CtrlMsg::CapacityRequest(cr) => {
                self.stats.capacity_requests_received += 1;
                for entry in &cr.requests {
                    // Requests carry absolute remaining backlog, not deltas
                    self.demand.insert(
                        (cr.terminal_id, entry.rc_index),
                        u64::from(entry.requested_bytes),
                    );
                }
                debug!(
                    "Terminal {} signals demand on {} classes",
                    cr.terminal_id,
                    cr.requests.len()
                );
            }
            CtrlMsg::HandoverRecommendation(hr) => {
                self.stats.recommendations_received += 1;
                let timu = CtrlMsg::Timu(TimuMessage {
                    terminal_id: hr.terminal_id,
                    target_beam_id: hr.recommended_beam_id,
                    gw_address: gw_address_for_beam(hr.recommended_beam_id),
                });
                info!(
                    "Ordering terminal {} to beam {}",
                    hr.terminal_id, hr.recommended_beam_id
                );
                let at = queue.now() + self.ncc.logon_response_delay;
                let m = self.timer_msg(queue.now(), NccTimer::Forward(timu));
                queue.schedule_at(at, m);
            }
            other => assert_warn!(false, "Unexpected {} on the return link", other),
        }
    }

    fn rx_phy_rx_ind(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::PhyRxInd(prim) = message.msg else {
            panic!("Expected PhyRxInd!");
        };
        trace!("rx_phy_rx_ind: {:?}", prim);

        let burst = prim.burst;
        self.stats.bursts_received += 1;

        // Replicas of an already decoded CRDSA packet carry nothing new
        if burst.access == TxAccessMode::Crdsa {
            let Some(tag) = &burst.crdsa else {
                panic!("CRDSA burst without replica tag");
            };
            self.stats.crdsa_replicas_received += 1;
            if !self.crdsa_seen.insert(tag.packet_id) {
                trace!("Duplicate CRDSA packet {}", tag.packet_id);
                return;
            }
        }

        for packet in &burst.packets {
            match &packet.kind {
                PacketKind::Data => {
                    self.stats.data_bytes_received += u64::from(packet.len_bytes);
                }
                PacketKind::Control(msg) => self.process_control(queue, msg),
            }
        }
    }

    /// Builds the next burst time plan and hands it to the forward link.
    fn rx_tbtp_tick(&mut self, queue: &mut MessageQueue) {
        trace!("rx_tbtp_tick");

        let now = queue.now();
        let current_id = self.seq.superframe_id_at(RETURN_LINK_SEQ, now);
        let target_id = current_id + 1;

        if !self.logged_on.is_empty() {
            let mut tbtp = TbtpMessage::new(
                RETURN_LINK_SEQ,
                SuperframeSeq::wire_superframe_id(target_id),
            );
            let frame_count = self.seq.conf(RETURN_LINK_SEQ).frames().len();
            let da_frame = frame_count - 1;
            let mut slot_cursor: u16 = 0;

            for terminal_id in self.logged_on.clone() {
                let slots = self.grant_slots(terminal_id, da_frame, &mut slot_cursor);
                // An empty entry still tells the terminal it is being scheduled
                tbtp.entries.push(TbtpEntry { terminal_id, slots });
            }

            debug!(
                "TBTP for superframe {}: {} entries",
                target_id,
                tbtp.entries.len()
            );
            self.stats.tbtps_sent += 1;
            self.send_signaling(queue, CtrlMsg::Tbtp(tbtp));
        }

        let interval =
            self.seq.superframe_duration(RETURN_LINK_SEQ) * u64::from(self.ncc.tbtp_interval_superframes);
        let m = self.timer_msg(now, NccTimer::TbtpTick);
        queue.schedule_at(now + interval, m);
    }

    /// Serves the signaled demand of one terminal, lowest request class
    /// first, within the per-TBTP slot budget.
    fn grant_slots(
        &mut self,
        terminal_id: TerminalId,
        da_frame: usize,
        slot_cursor: &mut u16,
    ) -> Vec<TbtpTimeSlotInfo> {
        let slot_count = self.seq.conf(RETURN_LINK_SEQ).frames()[da_frame].slot_count();
        let mut slots = Vec::new();
        let mut budget = self.ncc.slots_per_tbtp;

        let mut rcs: Vec<RcIndex> = self
            .demand
            .keys()
            .filter(|(tid, _)| *tid == terminal_id)
            .map(|(_, rc)| *rc)
            .collect();
        rcs.sort_unstable();

        for rc in rcs {
            while budget > 0 {
                let outstanding = self.demand.get(&(terminal_id, rc)).copied().unwrap_or(0);
                if outstanding == 0 {
                    self.demand.remove(&(terminal_id, rc));
                    break;
                }
                if *slot_cursor >= slot_count {
                    warn!("Out of demand-assigned slots in frame {}", da_frame);
                    return slots;
                }
                slots.push(TbtpTimeSlotInfo {
                    frame_index: da_frame,
                    slot_id: *slot_cursor,
                    carrier_id: DA_CARRIER_ID,
                    waveform_id: DA_WAVEFORM_ID,
                    rc_index: rc,
                    payload_bytes: self.ncc.bytes_per_slot,
                });
                *slot_cursor += 1;
                budget -= 1;
                let served = outstanding.saturating_sub(u64::from(self.ncc.bytes_per_slot));
                if served == 0 {
                    self.demand.remove(&(terminal_id, rc));
                    break;
                }
                self.demand.insert((terminal_id, rc), served);
            }
        }
        slots
    }

    fn rx_ncc_timer_ind(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::NccTimerInd(prim) = message.msg else {
            panic!("Expected NccTimerInd!");
        };

        match prim.kind {
            NccTimer::TbtpTick => self.rx_tbtp_tick(queue),
            NccTimer::Forward(msg) => {
                debug!("Forward link delivery of {}", msg);
                self.send_signaling(queue, msg);
            }
        }
    }

    fn rx_phy_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match &message.msg {
            SapMsgInner::PhyRxInd(_) => self.rx_phy_rx_ind(queue, message),
            _ => panic!("Unhandled PHY-SAP prim {}", message.msg),
        }
    }

    fn rx_timer_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match &message.msg {
            SapMsgInner::NccTimerInd(_) => self.rx_ncc_timer_ind(queue, message),
            _ => panic!("Unhandled Timer-SAP prim {}", message.msg),
        }
    }
}

impl SatEntityTrait for NccSim {
    fn entity(&self) -> SatEntity {
        self.self_component
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn start(&mut self, queue: &mut MessageQueue) {
        // First plan goes out right away so grants exist from superframe 1 on
        let m = self.timer_msg(queue.now(), NccTimer::TbtpTick);
        queue.schedule_at(queue.now(), m);
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.sap {
            Sap::PhySap => self.rx_phy_prim(queue, message),
            Sap::TimerSap => self.rx_timer_prim(queue, message),
            _ => panic!("NCC cannot handle {:?} prims", message.sap),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use sat_config::terminal_config::TerminalConfig;
    use sat_core::sim_time::SimTime;
    use sat_pdus::capacity_request::{CapacityRequest, CapacityRequestEntry};
    use sat_pdus::handover_recommendation::HandoverRecommendation;
    use sat_pdus::logon::LogonRequest;
    use sat_saps::phy::{CrdsaReplicaTag, MacPacket, PhyRxInd, SatBurst};

    fn test_ncc() -> NccSim {
        let mut cfg = TerminalConfig::new(6);
        cfg.ncc = Some(CfgNcc {
            logon_response_delay: SimTime::from_millis(50),
            tbtp_interval_superframes: 1,
            slots_per_tbtp: 2,
            bytes_per_slot: 400,
        });
        NccSim::new(SharedConfig::from_config(cfg))
    }

    fn rx_ind(burst: SatBurst) -> SapMsg {
        SapMsg {
            sap: Sap::PhySap,
            src: SatEntity::Phy,
            dest: SatEntity::Ncc,
            t_submit: SimTime::ZERO,
            msg: SapMsgInner::PhyRxInd(PhyRxInd { burst }),
        }
    }

    fn control_burst(access: TxAccessMode, msg: CtrlMsg) -> SatBurst {
        SatBurst {
            access,
            carrier_id: 0,
            channel_id: Some(0),
            slot_id: Some(1),
            duration: SimTime::from_micros(500),
            packets: vec![MacPacket {
                kind: PacketKind::Control(msg.clone()),
                len_bytes: msg.len_bytes(),
                rc_index: 0,
            }],
            crdsa: None,
        }
    }

    fn tick_msg() -> SapMsg {
        SapMsg {
            sap: Sap::TimerSap,
            src: SatEntity::Ncc,
            dest: SatEntity::Ncc,
            t_submit: SimTime::ZERO,
            msg: SapMsgInner::NccTimerInd(NccTimerInd {
                kind: NccTimer::TbtpTick,
            }),
        }
    }

    fn fire_scheduled(queue: &mut MessageQueue, ncc: &mut NccSim) {
        let at = queue.next_fire_time().unwrap();
        queue.advance_to(at);
        while let Some(m) = queue.pop_fired() {
            ncc.rx_prim(queue, m);
        }
    }

    #[test]
    fn logon_request_is_answered_after_the_delay() {
        let mut ncc = test_ncc();
        let mut queue = MessageQueue::default();

        let burst = control_burst(
            TxAccessMode::Logon,
            CtrlMsg::LogonRequest(LogonRequest { terminal_id: 6 }),
        );
        ncc.rx_prim(&mut queue, rx_ind(burst));
        assert_eq!(ncc.logged_terminals(), &[6]);

        assert_eq!(queue.next_fire_time().unwrap(), SimTime::from_millis(50));
        fire_scheduled(&mut queue, &mut ncc);

        let out = queue.pop_front().unwrap();
        assert_eq!(out.dest, SatEntity::Phy);
        let SapMsgInner::PhySignalingInd(ind) = &out.msg else {
            panic!("expected PhySignalingInd");
        };
        let CtrlMsg::LogonResponse(resp) = &ind.msg else {
            panic!("expected LogonResponse");
        };
        assert_eq!(resp.terminal_id, 6);
    }

    #[test]
    fn tbtp_grants_slots_against_signaled_demand() {
        let mut ncc = test_ncc();
        let mut queue = MessageQueue::default();

        ncc.rx_prim(
            &mut queue,
            rx_ind(control_burst(
                TxAccessMode::Logon,
                CtrlMsg::LogonRequest(LogonRequest { terminal_id: 6 }),
            )),
        );
        ncc.rx_prim(
            &mut queue,
            rx_ind(control_burst(
                TxAccessMode::SlottedAloha,
                CtrlMsg::CapacityRequest(CapacityRequest {
                    terminal_id: 6,
                    requests: vec![CapacityRequestEntry {
                        rc_index: 1,
                        requested_bytes: 1000,
                    }],
                }),
            )),
        );

        ncc.rx_prim(&mut queue, tick_msg());
        let mut tbtp = None;
        while let Some(m) = queue.pop_front() {
            if let SapMsgInner::PhySignalingInd(ind) = &m.msg {
                if let CtrlMsg::Tbtp(t) = &ind.msg {
                    tbtp = Some(t.clone());
                }
            }
        }
        let tbtp = tbtp.unwrap();
        let entry = tbtp.entry_for(6).unwrap();
        // 1000 bytes at 400 per slot needs 3 slots but the budget is 2
        assert_eq!(entry.slots.len(), 2);
        assert_eq!(entry.slots[0].rc_index, 1);
        assert_eq!(entry.slots[0].payload_bytes, 400);
        assert_eq!(entry.slots[0].slot_id, 0);
        assert_eq!(entry.slots[1].slot_id, 1);

        // Remaining 200 bytes are served on the next tick
        ncc.rx_prim(&mut queue, tick_msg());
        let mut next = None;
        while let Some(m) = queue.pop_front() {
            if let SapMsgInner::PhySignalingInd(ind) = &m.msg {
                if let CtrlMsg::Tbtp(t) = &ind.msg {
                    next = Some(t.clone());
                }
            }
        }
        assert_eq!(next.unwrap().entry_for(6).unwrap().slots.len(), 1);
    }

    #[test]
    fn no_tbtp_before_any_terminal_logs_on() {
        let mut ncc = test_ncc();
        let mut queue = MessageQueue::default();

        ncc.rx_prim(&mut queue, tick_msg());
        assert!(queue.pop_front().is_none());
        assert_eq!(ncc.stats().tbtps_sent, 0);
        // The tick itself keeps running
        assert!(queue.next_fire_time().is_some());
    }

    #[test]
    fn recommendation_turns_into_a_timu() {
        let mut ncc = test_ncc();
        let mut queue = MessageQueue::default();

        let burst = control_burst(
            TxAccessMode::SlottedAloha,
            CtrlMsg::HandoverRecommendation(HandoverRecommendation {
                terminal_id: 6,
                recommended_beam_id: 12,
            }),
        );
        ncc.rx_prim(&mut queue, rx_ind(burst));
        fire_scheduled(&mut queue, &mut ncc);

        let out = queue.pop_front().unwrap();
        let SapMsgInner::PhySignalingInd(ind) = &out.msg else {
            panic!("expected PhySignalingInd");
        };
        let CtrlMsg::Timu(timu) = &ind.msg else {
            panic!("expected Timu");
        };
        assert_eq!(timu.terminal_id, 6);
        assert_eq!(timu.target_beam_id, 12);
        assert_eq!(timu.gw_address, gw_address_for_beam(12));
    }

    #[test]
    fn crdsa_replicas_are_decoded_once() {
        let mut ncc = test_ncc();
        let mut queue = MessageQueue::default();

        for slot_id in [2u16, 7, 13] {
            let burst = SatBurst {
                access: TxAccessMode::Crdsa,
                carrier_id: 0,
                channel_id: Some(0),
                slot_id: Some(slot_id),
                duration: SimTime::from_micros(500),
                packets: vec![MacPacket {
                    kind: PacketKind::Data,
                    len_bytes: 500,
                    rc_index: 1,
                }],
                crdsa: Some(CrdsaReplicaTag {
                    packet_id: 42,
                    slot_ids: vec![2, 7, 13],
                }),
            };
            ncc.rx_prim(&mut queue, rx_ind(burst));
        }

        assert_eq!(ncc.stats().crdsa_replicas_received, 3);
        assert_eq!(ncc.unique_crdsa_packets(), 1);
        assert_eq!(ncc.stats().data_bytes_received, 500);
    }
}
