use sat_config::SharedConfig;
use sat_core::sat_common::{BeamId, ChannelId, GwAddress, RcIndex, Sap};
use sat_core::sat_entities::SatEntity;
use sat_core::{assert_warn, SimTime, SuperframeSeq};
use sat_pdus::{CtrlMsg, HandoverRecommendation, LogonRequest, TbtpMessage};
use sat_saps::llc::{QueueEvent, TxJob, TxOpportunityReq};
use sat_saps::phy::{CrdsaReplicaTag, MacPacket, PacketKind, PhyConfigureReq, PhyTxReq, SatBurst, TxAccessMode};
use sat_saps::rm::ResourceAssignInd;
use sat_saps::timer::{CrdsaTxJob, DaTxJob, EssaTxJob, MacTimer, MacTimerInd, RaTxJob, TxFireJob};
use sat_saps::{SapMsg, SapMsgInner};

use crate::mac::handover::{BeamAuthority, HandoverMachine};
use crate::mac::logon::LogonMachine;
use crate::mac::random_access::RandomAccess;
use crate::mac::tbtp::TbtpConsumer;
use crate::{EventHandle, MessagePrio, MessageQueue, SatEntityTrait};

/// Superframe sequence used for the return link.
const RETURN_LINK_SEQ: u8 = 0;

/// Return-link MAC of the user terminal.
///
/// Owns the contention scheduler, the logon and handover machines and the
/// TBTP consumer, and turns their decisions into scheduled transmit events.
pub struct UtMac {
    self_component: SatEntity,
    config: SharedConfig,
    seq: SuperframeSeq,
    random_access: RandomAccess,
    logon: LogonMachine,
    handover: HandoverMachine,
    tbtp_consumer: TbtpConsumer,
    beam_authority: Box<dyn BeamAuthority>,

    /// May be reassigned by the logon response.
    assigned_ra_channel: ChannelId,
    logon_channel: ChannelId,
    /// Queue backlog per request class, mirrored from LLC queue events.
    queued_bytes: Vec<u32>,
    /// Outstanding transmit events with their fire times, cancelled
    /// wholesale when a beam switch suppresses transmission.
    pending_tx: Vec<(SimTime, EventHandle)>,
    /// Open CRDSA block evaluation, drives the payload fetch chain.
    crdsa_block: Option<CrdsaBlockCtx>,
    next_opportunity_handle: u64,
    gw_address: Option<GwAddress>,
}

struct CrdsaBlockCtx {
    channel_id: ChannelId,
    rc_index: RcIndex,
    target_superframe_id: u64,
    block_tx_time: SimTime,
    payloads_scheduled: u32,
}

impl UtMac {
    pub fn new(config: SharedConfig, beam_authority: Box<dyn BeamAuthority>) -> Self {
        let cfg = config.config();
        let seq = match cfg.superframe_seq() {
            Ok(seq) => seq,
            Err(e) => panic!("Invalid superframe configuration: {:?}", e),
        };
        let seed = cfg.sim.seed.unwrap_or(cfg.terminal_id as u64);
        let random_access = RandomAccess::new(&cfg.ra_channels, seed);
        let logon = LogonMachine::new(
            cfg.logon.window_init,
            cfg.logon.max_waiting_time,
            seed.wrapping_add(1),
        );
        let handover = HandoverMachine::new(cfg.handover.max_messages_sent);
        let tbtp_consumer = TbtpConsumer::new(
            cfg.terminal_id,
            cfg.mac.timing_advance,
            cfg.mac.guard_time,
            cfg.llc.rc_count as usize,
        );
        let assigned_ra_channel = cfg.mac.assigned_ra_channel;
        let logon_channel = cfg.mac.logon_channel;
        let queued_bytes = vec![0; cfg.llc.rc_count as usize];

        Self {
            self_component: SatEntity::Mac,
            config,
            seq,
            random_access,
            logon,
            handover,
            tbtp_consumer,
            beam_authority,
            assigned_ra_channel,
            logon_channel,
            queued_bytes,
            pending_tx: Vec::new(),
            crdsa_block: None,
            next_opportunity_handle: 0,
            gw_address: None,
        }
    }

    pub fn random_access(&self) -> &RandomAccess {
        &self.random_access
    }

    pub fn logon(&self) -> &LogonMachine {
        &self.logon
    }

    pub fn handover(&self) -> &HandoverMachine {
        &self.handover
    }

    pub fn pending_tx_count(&self) -> usize {
        self.pending_tx.len()
    }

    /// Gateway serving the current beam, announced by the last TIM-U.
    pub fn gw_address(&self) -> Option<GwAddress> {
        self.gw_address
    }

    fn is_logged_on(&self) -> bool {
        self.logon.is_logged_on() || !self.config.config().logon.enabled
    }

    /// A control message may go out over random access right now.
    pub fn control_msg_transmission_possible(&self) -> bool {
        self.is_logged_on() && !self.handover.tx_suppressed()
    }

    pub fn logon_msg_transmission_possible(&self, now: SimTime) -> bool {
        self.logon.transmission_possible(now) && !self.handover.tx_suppressed()
    }

    // --- frame start ---

    fn do_frame_start(&mut self, queue: &mut MessageQueue) {
        let now = queue.now();
        let current_superframe_id = self.seq.superframe_id_at(RETURN_LINK_SEQ, now);
        tracing::debug!("frame start: sf {} at {}", current_superframe_id, now);

        self.random_access.prune_past_slots(current_superframe_id);
        self.random_access.slot_tracker().log_used_slots();
        self.pending_tx.retain(|(t, _)| *t >= now);

        if self.config.config().logon.enabled && self.logon_msg_transmission_possible(now) {
            self.send_logon_request(queue, current_superframe_id);
        }

        if self.config.config().handover.enabled && self.is_logged_on() {
            self.check_beam(queue);
        }

        if self.is_logged_on() && !self.handover.tx_suppressed() {
            self.evaluate_crdsa_block(queue, current_superframe_id);
            self.evaluate_essa(queue);
        }

        let next = self.seq.next_superframe_start(RETURN_LINK_SEQ, now);
        queue.schedule_at(next, self.timer_msg(now, MacTimer::FrameStart));
    }

    fn check_beam(&mut self, queue: &mut MessageQueue) {
        let now = queue.now();
        let current_beam = self.config.state_read().current_beam;
        if self.beam_authority.beam_still_best(current_beam, now) {
            return;
        }
        let Some(best) = self.beam_authority.best_beam(now) else {
            tracing::error!("beam check: no usable beam measurement, staying on beam {}", current_beam);
            return;
        };
        if best == current_beam {
            tracing::trace!("beam check: beam {} degraded but still the best choice", current_beam);
            return;
        }
        if self.handover.beam_check_failed() {
            let msg = CtrlMsg::HandoverRecommendation(HandoverRecommendation {
                terminal_id: self.config.config().terminal_id,
                recommended_beam_id: best,
            });
            self.send_ctrl_msg(queue, msg);
        }
    }

    // --- logon ---

    fn send_logon_request(&mut self, queue: &mut MessageQueue, current_superframe_id: u64) {
        let now = queue.now();
        let target_superframe_id = current_superframe_id + 1;
        let Some(slot_id) = self
            .random_access
            .slotted_aloha_select_slot(self.logon_channel, target_superframe_id)
        else {
            return;
        };

        let (tx_time, duration) = self.ra_slot_tx_time(self.logon_channel, target_superframe_id, slot_id, now);
        let msg = CtrlMsg::LogonRequest(LogonRequest {
            terminal_id: self.config.config().terminal_id,
        });
        tracing::info!("sending logon request in sf {} slot {} at {}", target_superframe_id, slot_id, tx_time);
        let job = TxFireJob::Logon(RaTxJob {
            channel_id: self.logon_channel,
            slot_id,
            duration,
            msg,
        });
        let handle = queue.schedule_at(tx_time, self.timer_msg(now, MacTimer::TxFire(job)));
        self.pending_tx.push((tx_time, handle));
        self.logon.request_sent(now);
    }

    // --- random access evaluation ---

    fn evaluate_crdsa_block(&mut self, queue: &mut MessageQueue, current_superframe_id: u64) {
        let now = queue.now();
        if self.crdsa_block.is_some() {
            tracing::warn!("crdsa block evaluation still open, skipping this frame");
            return;
        }

        // The gate must run for every channel to keep idle countdowns moving
        let mut selected: Option<ChannelId> = None;
        for channel_id in 0..self.random_access.channel_count() as ChannelId {
            let eligible = self.random_access.crdsa_block_eligible(channel_id, now);
            if eligible && selected.is_none() {
                let control_only = self.config.config().mac.crdsa_only_for_control;
                if self.backlogged_rc(control_only).is_some() {
                    selected = Some(channel_id);
                } else {
                    self.random_access.crdsa_block_done(channel_id, 0, now);
                }
            }
        }
        let Some(channel_id) = selected else {
            return;
        };

        let control_only = self.config.config().mac.crdsa_only_for_control;
        let Some(rc_index) = self.backlogged_rc(control_only) else {
            return;
        };
        let target_superframe_id = current_superframe_id + 1;
        let block_tx_time = self.seq.superframe_start_time(RETURN_LINK_SEQ, target_superframe_id);
        tracing::debug!(
            "crdsa block opened: ch {} rc {} target sf {}",
            channel_id, rc_index, target_superframe_id
        );
        self.crdsa_block = Some(CrdsaBlockCtx {
            channel_id,
            rc_index,
            target_superframe_id,
            block_tx_time,
            payloads_scheduled: 0,
        });
        let bytes_max = self.config.config().ra_channels[channel_id as usize].payload_bytes;
        self.send_tx_opportunity_req(queue, rc_index, bytes_max, TxJob::CrdsaPayload { channel_id });
    }

    fn evaluate_essa(&mut self, queue: &mut MessageQueue) {
        let now = queue.now();
        if !self.is_logged_on() || self.handover.tx_suppressed() {
            return;
        }
        if self.random_access.is_essa_scheduled() {
            return;
        }
        let Some(rc_index) = self.backlogged_rc(false) else {
            return;
        };
        let Some(channel_id) = (0..self.random_access.channel_count() as ChannelId)
            .find(|ch| self.random_access.essa_allowed(*ch, now))
        else {
            return;
        };

        let conf = &self.config.config().ra_channels[channel_id as usize];
        let payload_bytes = conf.payload_bytes;
        let frame_index = conf.frame_index;
        let duration = self.seq.conf(RETURN_LINK_SEQ).frames()[frame_index].slot_duration();
        let tx_time = self.random_access.essa_reserve_tx_time(channel_id, now);
        self.random_access.set_essa_scheduled(true);
        tracing::debug!("essa transmission scheduled: ch {} rc {} at {}", channel_id, rc_index, tx_time);
        let job = TxFireJob::Essa(EssaTxJob {
            channel_id,
            rc_index,
            payload_bytes,
            duration,
        });
        let handle = queue.schedule_at(tx_time, self.timer_msg(now, MacTimer::TxFire(job)));
        self.pending_tx.push((tx_time, handle));
    }

    fn backlogged_rc(&self, control_only: bool) -> Option<RcIndex> {
        if control_only {
            return (self.queued_bytes[0] > 0).then_some(0);
        }
        self.queued_bytes
            .iter()
            .position(|bytes| *bytes > 0)
            .map(|rc| rc as RcIndex)
    }

    // --- control messages over slotted aloha ---

    fn send_ctrl_msg(&mut self, queue: &mut MessageQueue, msg: CtrlMsg) {
        let now = queue.now();
        if !self.control_msg_transmission_possible() {
            tracing::debug!("control message {} deferred, transmission not possible", msg);
            return;
        }
        let channel_id = self.assigned_ra_channel;
        if !self.random_access.slotted_aloha_allowed(channel_id) {
            tracing::warn!("control message {} dropped, channel {} does not allow slotted aloha", msg, channel_id);
            return;
        }

        let target_superframe_id = self.seq.superframe_id_at(RETURN_LINK_SEQ, now) + 1;
        let Some(slot_id) = self
            .random_access
            .slotted_aloha_select_slot(channel_id, target_superframe_id)
        else {
            tracing::debug!("control message {} missed its opportunity, window exhausted", msg);
            return;
        };

        let (tx_time, duration) = self.ra_slot_tx_time(channel_id, target_superframe_id, slot_id, now);
        tracing::debug!("control message {} in sf {} slot {} at {}", msg, target_superframe_id, slot_id, tx_time);
        let job = TxFireJob::SlottedAloha(RaTxJob {
            channel_id,
            slot_id,
            duration,
            msg,
        });
        let handle = queue.schedule_at(tx_time, self.timer_msg(now, MacTimer::TxFire(job)));
        self.pending_tx.push((tx_time, handle));
    }

    /// Absolute burst start for a random access slot, guard time applied.
    fn ra_slot_tx_time(&self, channel_id: ChannelId, superframe_id: u64, slot_id: u16, now: SimTime) -> (SimTime, SimTime) {
        let cfg = self.config.config();
        let frame_index = cfg.ra_channels[channel_id as usize].frame_index;
        let conf = self.seq.conf(RETURN_LINK_SEQ);
        let frame = &conf.frames()[frame_index];
        let nominal = self.seq.superframe_start_time(RETURN_LINK_SEQ, superframe_id)
            + cfg.mac.timing_advance
            + conf.frame_start_offset(frame_index)
            + frame.slot_offset(slot_id);
        let tx_time = nominal.saturating_sub(cfg.mac.guard_time).max(now);
        (tx_time, frame.slot_duration())
    }

    // --- transmit fire path ---

    fn do_tx_fire(&mut self, queue: &mut MessageQueue, job: TxFireJob) {
        match job {
            TxFireJob::Da(da) => {
                let rc_index = da.rc_index;
                let bytes_max = da.payload_bytes;
                self.send_tx_opportunity_req(queue, rc_index, bytes_max, TxJob::Da(da));
            }
            TxFireJob::Essa(essa) => {
                let rc_index = essa.rc_index;
                let bytes_max = essa.payload_bytes;
                self.send_tx_opportunity_req(queue, rc_index, bytes_max, TxJob::Essa(essa));
            }
            TxFireJob::SlottedAloha(ra) => {
                let burst = SatBurst {
                    access: TxAccessMode::SlottedAloha,
                    carrier_id: ra.channel_id as u16,
                    channel_id: Some(ra.channel_id),
                    slot_id: Some(ra.slot_id),
                    duration: ra.duration,
                    packets: vec![control_packet(ra.msg)],
                    crdsa: None,
                };
                self.transmit_burst(queue, burst);
            }
            TxFireJob::Logon(ra) => {
                let burst = SatBurst {
                    access: TxAccessMode::Logon,
                    carrier_id: ra.channel_id as u16,
                    channel_id: Some(ra.channel_id),
                    slot_id: Some(ra.slot_id),
                    duration: ra.duration,
                    packets: vec![control_packet(ra.msg)],
                    crdsa: None,
                };
                self.transmit_burst(queue, burst);
            }
            TxFireJob::CrdsaReplica(replica) => {
                let burst = SatBurst {
                    access: TxAccessMode::Crdsa,
                    carrier_id: replica.channel_id as u16,
                    channel_id: Some(replica.channel_id),
                    slot_id: Some(replica.slot_id),
                    duration: replica.duration,
                    packets: replica.packets,
                    crdsa: Some(CrdsaReplicaTag {
                        packet_id: replica.packet_id,
                        slot_ids: replica.slot_ids,
                    }),
                };
                self.transmit_burst(queue, burst);
            }
        }
    }

    fn send_tx_opportunity_req(&mut self, queue: &mut MessageQueue, rc_index: RcIndex, bytes_max: u32, job: TxJob) {
        let handle = self.next_opportunity_handle;
        self.next_opportunity_handle += 1;
        let m = SapMsg {
            sap: Sap::LlcSap,
            src: self.self_component,
            dest: SatEntity::Llc,
            t_submit: queue.now(),
            msg: SapMsgInner::TxOpportunityReq(TxOpportunityReq {
                handle,
                rc_index,
                bytes_max,
                job,
            }),
        };
        queue.push_back(m);
    }

    fn transmit_burst(&mut self, queue: &mut MessageQueue, burst: SatBurst) {
        tracing::info!(
            "tx {:?} burst: {} packet(s), {} bytes, carrier {} slot {:?}",
            burst.access,
            burst.packets.len(),
            burst.total_bytes(),
            burst.carrier_id,
            burst.slot_id
        );
        let m = SapMsg {
            sap: Sap::PhySap,
            src: self.self_component,
            dest: SatEntity::Phy,
            t_submit: queue.now(),
            msg: SapMsgInner::PhyTxReq(PhyTxReq { burst }),
        };
        // The burst must leave ahead of same-instant bookkeeping messages
        queue.push_prio(m, MessagePrio::Immediate);
    }

    // --- transmit opportunity confirmations ---

    fn rx_tx_opportunity_cnf(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::TxOpportunityCnf(cnf) = message.msg else { panic!() };
        tracing::trace!("rx_tx_opportunity_cnf: handle {} {} packet(s)", cnf.handle, cnf.packets.len());

        match cnf.job {
            TxJob::Da(da) => {
                if cnf.packets.is_empty() {
                    tracing::debug!("granted slot on carrier {} unused, queue empty", da.carrier_id);
                    return;
                }
                let burst = SatBurst {
                    access: TxAccessMode::Da,
                    carrier_id: da.carrier_id,
                    channel_id: None,
                    slot_id: None,
                    duration: da.duration,
                    packets: cnf.packets,
                    crdsa: None,
                };
                self.transmit_burst(queue, burst);
            }
            TxJob::CrdsaPayload { channel_id } => {
                self.continue_crdsa_block(queue, channel_id, cnf.packets, cnf.queued_bytes_left);
            }
            TxJob::Essa(essa) => {
                self.random_access.set_essa_scheduled(false);
                if cnf.packets.is_empty() {
                    tracing::debug!("essa opportunity on ch {} unused, queue empty", essa.channel_id);
                    return;
                }
                let channel_id = essa.channel_id;
                let burst = SatBurst {
                    access: TxAccessMode::Essa,
                    carrier_id: channel_id as u16,
                    channel_id: Some(channel_id),
                    slot_id: None,
                    duration: essa.duration,
                    packets: cnf.packets,
                    crdsa: None,
                };
                self.transmit_burst(queue, burst);
                self.random_access.essa_tx_done(channel_id, queue.now());
                if cnf.queued_bytes_left > 0 {
                    self.evaluate_essa(queue);
                }
            }
        }
    }

    fn continue_crdsa_block(&mut self, queue: &mut MessageQueue, channel_id: ChannelId, packets: Vec<MacPacket>, queued_bytes_left: u32) {
        let now = queue.now();
        let Some(block) = self.crdsa_block.as_ref() else {
            tracing::warn!("stray crdsa payload confirmation for ch {}", channel_id);
            return;
        };
        let target_superframe_id = block.target_superframe_id;

        if packets.is_empty() {
            self.finish_crdsa_block();
            return;
        }

        let Some(slot_ids) = self
            .random_access
            .crdsa_select_replica_slots(channel_id, target_superframe_id)
        else {
            self.finish_crdsa_block();
            return;
        };
        let packet_id = self.random_access.next_crdsa_packet_id();
        for slot_id in &slot_ids {
            let (tx_time, duration) = self.ra_slot_tx_time(channel_id, target_superframe_id, *slot_id, now);
            let job = TxFireJob::CrdsaReplica(CrdsaTxJob {
                channel_id,
                slot_id: *slot_id,
                duration,
                packet_id,
                slot_ids: slot_ids.clone(),
                packets: packets.clone(),
            });
            let handle = queue.schedule_at(tx_time, self.timer_msg(now, MacTimer::TxFire(job)));
            self.pending_tx.push((tx_time, handle));
        }
        tracing::debug!(
            "crdsa payload {} scheduled: ch {} sf {} slots {:?}",
            packet_id, channel_id, target_superframe_id, slot_ids
        );

        let block = self.crdsa_block.as_mut().unwrap();
        block.payloads_scheduled += 1;
        let conf = &self.config.config().ra_channels[channel_id as usize];
        let max_unique = conf.crdsa_max_unique_payload_per_block;
        let bytes_max = conf.payload_bytes;
        let rc_index = block.rc_index;
        if block.payloads_scheduled < max_unique && queued_bytes_left > 0 {
            self.send_tx_opportunity_req(queue, rc_index, bytes_max, TxJob::CrdsaPayload { channel_id });
        } else {
            self.finish_crdsa_block();
        }
    }

    fn finish_crdsa_block(&mut self) {
        let Some(block) = self.crdsa_block.take() else {
            return;
        };
        tracing::debug!(
            "crdsa block closed: ch {} with {} payload(s)",
            block.channel_id, block.payloads_scheduled
        );
        self.random_access
            .crdsa_block_done(block.channel_id, block.payloads_scheduled, block.block_tx_time);
    }

    // --- forward link signaling ---

    fn rx_phy_signaling_ind(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::PhySignalingInd(prim) = message.msg else { panic!() };
        tracing::trace!("rx_phy_signaling_ind: {}", prim.msg);

        match prim.msg {
            CtrlMsg::Tbtp(tbtp) => {
                self.rx_tbtp(queue, tbtp);
            }
            CtrlMsg::LogonResponse(resp) => {
                if resp.terminal_id != self.config.config().terminal_id {
                    tracing::trace!("logon response for terminal {}, not us", resp.terminal_id);
                    return;
                }
                self.logon.response_received();
                self.assigned_ra_channel = resp.assigned_ra_channel;
                self.config.state_write().logged_on = true;
            }
            CtrlMsg::Timu(timu) => {
                if timu.terminal_id != self.config.config().terminal_id {
                    return;
                }
                self.rx_timu(queue, timu.target_beam_id, timu.gw_address);
            }
            other => {
                assert_warn!(false, "unexpected forward-link control message {}", other);
            }
        }
    }

    fn rx_tbtp(&mut self, queue: &mut MessageQueue, tbtp: TbtpMessage) {
        let now = queue.now();
        if !self.is_logged_on() {
            tracing::warn!("tbtp received while not logged on, ignored");
            return;
        }
        let Some(schedule) = self.tbtp_consumer.consume(&tbtp, &self.seq, now) else {
            return;
        };
        if let Some(first) = self.handover.first_transmittable_superframe_id() {
            if schedule.superframe_id < first {
                tracing::debug!(
                    "tbtp for sf {} precedes first transmittable sf {}, ignored",
                    schedule.superframe_id, first
                );
                return;
            }
        }
        self.handover.tbtp_received();

        for grant in schedule.grants {
            let tx_time = grant.tx_time;
            let job = TxFireJob::Da(DaTxJob {
                carrier_id: grant.carrier_id,
                duration: grant.duration,
                waveform_id: grant.waveform_id,
                rc_index: grant.rc_index,
                payload_bytes: grant.payload_bytes,
            });
            let handle = queue.schedule_at(tx_time, self.timer_msg(now, MacTimer::TxFire(job)));
            self.pending_tx.push((tx_time, handle));
        }

        let m = SapMsg {
            sap: Sap::RmSap,
            src: self.self_component,
            dest: SatEntity::Rm,
            t_submit: now,
            msg: SapMsgInner::ResourceAssignInd(ResourceAssignInd {
                bytes_per_rc: schedule.bytes_per_rc,
            }),
        };
        queue.push_back(m);
    }

    fn rx_timu(&mut self, queue: &mut MessageQueue, target_beam: BeamId, gw_address: GwAddress) {
        let now = queue.now();
        let current_superframe_id = self.seq.superframe_id_at(RETURN_LINK_SEQ, now);
        // The superframe after next is the first with grants for the new beam
        self.handover.switch_instructed(target_beam, current_superframe_id + 2);
        self.gw_address = Some(gw_address);
        self.cancel_pending_tx(queue);
        self.config.state_write().current_beam = target_beam;

        let m = SapMsg {
            sap: Sap::PhySap,
            src: self.self_component,
            dest: SatEntity::Phy,
            t_submit: now,
            msg: SapMsgInner::PhyConfigureReq(PhyConfigureReq { beam_id: target_beam }),
        };
        queue.push_back(m);
    }

    fn cancel_pending_tx(&mut self, queue: &mut MessageQueue) {
        let cancelled = self.pending_tx.len();
        for (_, handle) in self.pending_tx.drain(..) {
            queue.cancel(handle);
        }
        if cancelled > 0 {
            tracing::info!("cancelled {} pending transmission(s)", cancelled);
        }
    }

    // --- queue events ---

    fn rx_queue_event_ind(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::QueueEventInd(prim) = &message.msg else { panic!() };
        tracing::trace!(
            "rx_queue_event_ind: {:?} rc {} ({} bytes)",
            prim.event, prim.rc_index, prim.queued_bytes
        );
        self.queued_bytes[prim.rc_index as usize] = prim.queued_bytes;
        if prim.event == QueueEvent::FirstBufferRcvd {
            self.evaluate_essa(queue);
        }
    }

    fn rx_ctrl_msg_req(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::CtrlMsgReq(prim) = message.msg else { panic!() };
        self.send_ctrl_msg(queue, prim.msg);
    }

    // --- dispatch ---

    fn rx_phy_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.msg {
            SapMsgInner::PhySignalingInd(_) => {
                self.rx_phy_signaling_ind(queue, message);
            }
            _ => {
                panic!();
            }
        }
    }

    fn rx_llc_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.msg {
            SapMsgInner::QueueEventInd(_) => {
                self.rx_queue_event_ind(queue, message);
            }
            SapMsgInner::TxOpportunityCnf(_) => {
                self.rx_tx_opportunity_cnf(queue, message);
            }
            _ => {
                panic!();
            }
        }
    }

    fn rx_rm_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        match message.msg {
            SapMsgInner::CtrlMsgReq(_) => {
                self.rx_ctrl_msg_req(queue, message);
            }
            _ => {
                panic!();
            }
        }
    }

    fn rx_timer_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        let SapMsgInner::MacTimerInd(prim) = message.msg else { panic!() };
        match prim.kind {
            MacTimer::FrameStart => {
                self.do_frame_start(queue);
            }
            MacTimer::TxFire(job) => {
                self.do_tx_fire(queue, job);
            }
        }
    }

    fn timer_msg(&self, now: SimTime, kind: MacTimer) -> SapMsg {
        SapMsg {
            sap: Sap::TimerSap,
            src: self.self_component,
            dest: self.self_component,
            t_submit: now,
            msg: SapMsgInner::MacTimerInd(MacTimerInd { kind }),
        }
    }
}

fn control_packet(msg: CtrlMsg) -> MacPacket {
    MacPacket {
        len_bytes: msg.len_bytes(),
        rc_index: 0,
        kind: PacketKind::Control(msg),
    }
}

impl SatEntityTrait for UtMac {
    fn entity(&self) -> SatEntity {
        SatEntity::Mac
    }

    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg) {
        tracing::trace!("rx_prim: {:?}", message);

        match message.sap {
            Sap::PhySap => {
                self.rx_phy_prim(queue, message);
            }
            Sap::LlcSap => {
                self.rx_llc_prim(queue, message);
            }
            Sap::RmSap => {
                self.rx_rm_prim(queue, message);
            }
            Sap::TimerSap => {
                self.rx_timer_prim(queue, message);
            }
        }
    }

    fn start(&mut self, queue: &mut MessageQueue) {
        // First frame boundary coincides with simulation start
        queue.schedule_at(queue.now(), self.timer_msg(queue.now(), MacTimer::FrameStart));
    }
}
