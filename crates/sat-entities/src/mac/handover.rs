use sat_core::sat_common::BeamId;
use sat_core::SimTime;

/// Answers beam quality questions for the MAC.
pub trait BeamAuthority: Send {
    /// True when the given beam is still the best choice for this terminal.
    fn beam_still_best(&mut self, beam_id: BeamId, now: SimTime) -> bool;

    /// Best beam right now. None when no usable measurement exists, the
    /// caller then stays on its current beam.
    fn best_beam(&mut self, now: SimTime) -> Option<BeamId>;
}

/// Fixed beam plan: one beam is best up to a configured instant, another
/// one afterwards. Never degrades when no instant is set.
pub struct ScriptedBeamAuthority {
    initial_beam: BeamId,
    target_beam: BeamId,
    degrade_at: Option<SimTime>,
}

impl ScriptedBeamAuthority {
    pub fn new(initial_beam: BeamId, target_beam: BeamId, degrade_at: Option<SimTime>) -> Self {
        Self {
            initial_beam,
            target_beam,
            degrade_at,
        }
    }

    fn best(&self, now: SimTime) -> BeamId {
        match self.degrade_at {
            Some(at) if now >= at => self.target_beam,
            _ => self.initial_beam,
        }
    }
}

impl BeamAuthority for ScriptedBeamAuthority {
    fn beam_still_best(&mut self, beam_id: BeamId, now: SimTime) -> bool {
        self.best(now) == beam_id
    }

    fn best_beam(&mut self, now: SimTime) -> Option<BeamId> {
        Some(self.best(now))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverState {
    NoHandover,
    HandoverRecommendationSent,
    WaitingForTbtp,
}

/// Beam handover state of the terminal.
///
/// A degraded beam check raises a recommendation towards the NCC, resent on
/// later checks up to the configured message limit. The beam-switch
/// instruction moves the machine into a transmission-suppressed wait that
/// only the first TBTP received on the new beam releases.
pub struct HandoverMachine {
    state: HandoverState,
    messages_count: u32,
    max_messages_sent: u32,
    target_beam: Option<BeamId>,
    first_transmittable_superframe_id: Option<u64>,
}

impl HandoverMachine {
    pub fn new(max_messages_sent: u32) -> Self {
        Self {
            state: HandoverState::NoHandover,
            messages_count: 0,
            max_messages_sent,
            target_beam: None,
            first_transmittable_superframe_id: None,
        }
    }

    pub fn state(&self) -> HandoverState {
        self.state
    }

    pub fn messages_count(&self) -> u32 {
        self.messages_count
    }

    pub fn target_beam(&self) -> Option<BeamId> {
        self.target_beam
    }

    /// No TBTP grant before this superframe is valid on the new beam.
    pub fn first_transmittable_superframe_id(&self) -> Option<u64> {
        self.first_transmittable_superframe_id
    }

    /// True while every outgoing DA and RA transmission must be held back.
    pub fn tx_suppressed(&self) -> bool {
        self.state == HandoverState::WaitingForTbtp
    }

    /// The current beam failed its quality check. Returns true when a
    /// handover recommendation should be (re)sent.
    pub fn beam_check_failed(&mut self) -> bool {
        match self.state {
            HandoverState::NoHandover => {
                self.state = HandoverState::HandoverRecommendationSent;
                self.messages_count = 1;
                tracing::info!("handover: beam degraded, sending recommendation");
                true
            }
            HandoverState::HandoverRecommendationSent => {
                if self.messages_count < self.max_messages_sent {
                    self.messages_count += 1;
                    tracing::debug!("handover: resending recommendation ({}/{})", self.messages_count, self.max_messages_sent);
                    true
                } else {
                    tracing::trace!("handover: recommendation limit {} reached", self.max_messages_sent);
                    false
                }
            }
            HandoverState::WaitingForTbtp => false,
        }
    }

    /// Beam-switch instruction from the NCC. Transmissions are suppressed
    /// until a TBTP valid from `first_transmittable_superframe_id` arrives.
    pub fn switch_instructed(&mut self, target_beam: BeamId, first_transmittable_superframe_id: u64) {
        tracing::info!(
            "handover: switching to beam {}, first transmittable superframe {}",
            target_beam, first_transmittable_superframe_id
        );
        self.state = HandoverState::WaitingForTbtp;
        self.target_beam = Some(target_beam);
        self.first_transmittable_superframe_id = Some(first_transmittable_superframe_id);
    }

    /// A TBTP naming this terminal arrived. Returns true when it completed
    /// a pending handover.
    pub fn tbtp_received(&mut self) -> bool {
        if self.state != HandoverState::WaitingForTbtp {
            return false;
        }
        tracing::info!("handover: TBTP received on new beam, handover complete");
        self.state = HandoverState::NoHandover;
        self.messages_count = 0;
        self.target_beam = None;
        self.first_transmittable_superframe_id = None;
        true
    }
}
