use std::sync::{Arc, RwLock};

use sat_core::{BeamId, ChannelId, FrameConf, RcIndex, SimTime, SuperframeConf, SuperframeConfErr, SuperframeSeq, TerminalId};

use crate::alloc_channel::AllocationChannelConfig;

/// Superframe structure: an ordered list of frames, each split into
/// uniform time slots.
#[derive(Debug, Clone)]
pub struct CfgSuperframe {
    pub frames: Vec<CfgFrame>,
}

#[derive(Debug, Clone)]
pub struct CfgFrame {
    pub duration: SimTime,
    pub slot_count: u16,
}

impl Default for CfgSuperframe {
    fn default() -> Self {
        Self {
            frames: vec![CfgFrame {
                duration: SimTime::from_millis(100),
                slot_count: 160,
            }],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgSim {
    /// RNG seed; a fixed value gives reproducible runs.
    pub seed: Option<u64>,
    /// Superframes to run before the binary stops.
    pub superframes: u64,
    /// Send buffer content queued at simulation start.
    pub backlog: Vec<CfgBacklog>,
}

#[derive(Debug, Clone)]
pub struct CfgBacklog {
    pub rc_index: RcIndex,
    pub bytes: u32,
}

impl Default for CfgSim {
    fn default() -> Self {
        Self {
            seed: None,
            superframes: 100,
            backlog: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgMac {
    /// Slots are shortened by this much at the end to absorb timing error.
    pub guard_time: SimTime,
    /// Static timing advance applied to every scheduled transmission.
    pub timing_advance: SimTime,
    /// Allocation channel this terminal contends on.
    pub assigned_ra_channel: ChannelId,
    /// Allocation channel reserved for logon bursts.
    pub logon_channel: ChannelId,
    /// Restrict CRDSA payloads to control traffic.
    pub crdsa_only_for_control: bool,
    pub initial_beam_id: BeamId,
}

impl Default for CfgMac {
    fn default() -> Self {
        Self {
            guard_time: SimTime::from_micros(1),
            timing_advance: SimTime::ZERO,
            assigned_ra_channel: 0,
            logon_channel: 0,
            crdsa_only_for_control: false,
            initial_beam_id: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgLogon {
    pub enabled: bool,
    /// Initial maximum wait drawn before a logon attempt; doubles per retry.
    pub window_init: SimTime,
    /// How long to wait for a logon response before the next attempt.
    pub max_waiting_time: SimTime,
}

impl Default for CfgLogon {
    fn default() -> Self {
        Self {
            enabled: false,
            window_init: SimTime::from_secs(20),
            max_waiting_time: SimTime::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgHandover {
    pub enabled: bool,
    /// Recommendation repeats tolerated before the recommendation is
    /// considered lost and sent afresh.
    pub max_messages_sent: u32,
    /// Beam the scripted link measurement recommends once it degrades.
    pub target_beam: BeamId,
    /// Instant at which the serving beam stops being the best choice.
    /// None keeps the serving beam best for the whole run.
    pub degrade_after: Option<SimTime>,
}

impl Default for CfgHandover {
    fn default() -> Self {
        Self {
            enabled: false,
            max_messages_sent: 20,
            target_beam: 1,
            degrade_after: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgLlc {
    /// Number of request classes; class 0 carries control traffic.
    pub rc_count: u8,
    pub max_queue_bytes: u32,
}

impl Default for CfgLlc {
    fn default() -> Self {
        Self {
            rc_count: 3,
            max_queue_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgRm {
    pub enabled: bool,
    /// Cadence of the capacity-request evaluation timer.
    pub evaluation_interval: SimTime,
}

impl Default for CfgRm {
    fn default() -> Self {
        Self {
            enabled: true,
            evaluation_interval: SimTime::from_millis(100),
        }
    }
}

/// Settings for the bundled network control centre model, used by the demo
/// binary and the integration tests.
#[derive(Debug, Clone)]
pub struct CfgNcc {
    pub logon_response_delay: SimTime,
    pub tbtp_interval_superframes: u32,
    /// Demand-assigned slots granted per terminal and TBTP.
    pub slots_per_tbtp: u16,
    pub bytes_per_slot: u32,
}

impl Default for CfgNcc {
    fn default() -> Self {
        Self {
            logon_response_delay: SimTime::from_millis(50),
            tbtp_interval_superframes: 1,
            slots_per_tbtp: 1,
            bytes_per_slot: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub terminal_id: TerminalId,
    pub debug_log: Option<String>,

    pub sim: CfgSim,
    pub superframe: CfgSuperframe,
    pub mac: CfgMac,
    pub logon: CfgLogon,
    pub handover: CfgHandover,
    pub ra_channels: Vec<AllocationChannelConfig>,
    pub llc: CfgLlc,
    pub rm: CfgRm,
    pub ncc: Option<CfgNcc>,
}

impl TerminalConfig {
    pub fn new(terminal_id: TerminalId) -> Self {
        TerminalConfig {
            terminal_id,
            debug_log: None,
            sim: CfgSim::default(),
            superframe: CfgSuperframe::default(),
            mac: CfgMac::default(),
            logon: CfgLogon::default(),
            handover: CfgHandover::default(),
            ra_channels: vec![AllocationChannelConfig::default()],
            llc: CfgLlc::default(),
            rm: CfgRm::default(),
            ncc: None,
        }
    }

    /// Builds the timing model from the configured frame list.
    pub fn superframe_seq(&self) -> Result<SuperframeSeq, SuperframeConfErr> {
        let mut frames = Vec::with_capacity(self.superframe.frames.len());
        for frame in &self.superframe.frames {
            frames.push(FrameConf::new(frame.duration, frame.slot_count)?);
        }
        SuperframeSeq::new(vec![SuperframeConf::new(frames)?])
    }

    /// Validate that all required configuration fields are properly set.
    pub fn validate(&self) -> Result<(), String> {
        let seq = match self.superframe_seq() {
            Ok(seq) => seq,
            Err(e) => return Err(format!("invalid superframe configuration: {:?}", e)),
        };
        let conf = seq.conf(0);

        if self.ra_channels.is_empty() {
            return Err("at least one allocation channel must be configured".to_string());
        }
        for ch in &self.ra_channels {
            if let Err(e) = ch.sanity_check() {
                return Err(format!("allocation channel {}: {}", ch.channel_id, e));
            }
            let Some(frame) = conf.frame(ch.frame_index) else {
                return Err(format!(
                    "allocation channel {}: frame index {} out of range ({} frames)",
                    ch.channel_id,
                    ch.frame_index,
                    conf.frames().len()
                ));
            };
            if ch.crdsa_max_randomization_value >= frame.slot_count() {
                return Err(format!(
                    "allocation channel {}: randomization window ends at slot {} but frame {} has {} slots",
                    ch.channel_id,
                    ch.crdsa_max_randomization_value,
                    ch.frame_index,
                    frame.slot_count()
                ));
            }
        }

        if usize::from(self.mac.assigned_ra_channel) >= self.ra_channels.len() {
            return Err(format!(
                "assigned_ra_channel {} does not name a configured allocation channel",
                self.mac.assigned_ra_channel
            ));
        }
        if self.logon.enabled {
            if usize::from(self.mac.logon_channel) >= self.ra_channels.len() {
                return Err(format!(
                    "logon_channel {} does not name a configured allocation channel",
                    self.mac.logon_channel
                ));
            }
            if self.logon.window_init.is_zero() {
                return Err("logon window_init must be non-zero".to_string());
            }
            if self.logon.max_waiting_time.is_zero() {
                return Err("logon max_waiting_time must be non-zero".to_string());
            }
        }
        if self.llc.rc_count == 0 {
            return Err("llc rc_count must be at least 1".to_string());
        }
        for entry in &self.sim.backlog {
            if entry.rc_index >= self.llc.rc_count {
                return Err(format!(
                    "backlog entry names request class {} but only {} are configured",
                    entry.rc_index, self.llc.rc_count
                ));
            }
        }

        Ok(())
    }
}

/// Mutable, stack-editable state (lock-protected).
#[derive(Debug, Clone)]
pub struct TerminalState {
    pub logged_on: bool,
    pub current_beam: BeamId,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self {
            logged_on: false,
            current_beam: 0,
        }
    }
}

/// Global shared configuration: immutable config + mutable state.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<TerminalConfig>,
    /// Mutable state guarded with RwLock (write by the stack, read by others).
    state: Arc<RwLock<TerminalState>>,
}

impl SharedConfig {
    pub fn new(terminal_id: TerminalId) -> Self {
        Self::from_config(TerminalConfig::new(terminal_id))
    }

    pub fn from_config(cfg: TerminalConfig) -> Self {
        let state = TerminalState {
            logged_on: !cfg.logon.enabled,
            current_beam: cfg.mac.initial_beam_id,
        };
        Self::from_parts(cfg, state)
    }

    pub fn from_parts(cfg: TerminalConfig, state: TerminalState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid terminal configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<TerminalConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, TerminalState> {
        self.state.read().expect("TerminalState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, TerminalState> {
        self.state.write().expect("TerminalState RwLock blocked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TerminalConfig::new(1).validate().is_ok());
    }

    #[test]
    fn test_validation_catches_channel_frame_mismatch() {
        let mut cfg = TerminalConfig::new(1);
        cfg.ra_channels[0].frame_index = 7;
        assert!(cfg.validate().is_err());

        let mut cfg = TerminalConfig::new(1);
        // window reaches past the 160 slots of the default frame
        cfg.ra_channels[0].crdsa_max_randomization_value = 160;
        assert!(cfg.validate().is_err());

        let mut cfg = TerminalConfig::new(1);
        cfg.mac.assigned_ra_channel = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validation_checks_logon_settings_only_when_enabled() {
        let mut cfg = TerminalConfig::new(1);
        cfg.logon.window_init = SimTime::ZERO;
        assert!(cfg.validate().is_ok());

        cfg.logon.enabled = true;
        assert!(cfg.validate().is_err());
    }
}
