use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use sat_core::SimTime;

use super::alloc_channel::AllocationChannelConfig;
use super::terminal_config::{
    CfgBacklog, CfgFrame, CfgHandover, CfgLlc, CfgLogon, CfgMac, CfgNcc, CfgRm, CfgSim,
    SharedConfig, TerminalConfig,
};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.3";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref sim) = root.sim {
        if !sim.extra.is_empty() {
            return Err(format!("Unrecognized fields in sim: {:?}", sorted_keys(&sim.extra)).into());
        }
        for (i, b) in sim.backlog.iter().enumerate() {
            if !b.extra.is_empty() {
                return Err(format!(
                    "Unrecognized fields in sim.backlog[{}]: {:?}",
                    i,
                    sorted_keys(&b.extra)
                )
                .into());
            }
        }
    }
    if !root.superframe.extra.is_empty() {
        return Err(
            format!("Unrecognized fields in superframe: {:?}", sorted_keys(&root.superframe.extra)).into()
        );
    }
    for (i, frame) in root.superframe.frames.iter().enumerate() {
        if !frame.extra.is_empty() {
            return Err(format!(
                "Unrecognized fields in superframe.frames[{}]: {:?}",
                i,
                sorted_keys(&frame.extra)
            )
            .into());
        }
    }
    if let Some(ref mac) = root.mac {
        if !mac.extra.is_empty() {
            return Err(format!("Unrecognized fields in mac: {:?}", sorted_keys(&mac.extra)).into());
        }
    }
    if let Some(ref logon) = root.logon {
        if !logon.extra.is_empty() {
            return Err(
                format!("Unrecognized fields in logon: {:?}", sorted_keys(&logon.extra)).into()
            );
        }
    }
    if let Some(ref ho) = root.handover {
        if !ho.extra.is_empty() {
            return Err(
                format!("Unrecognized fields in handover: {:?}", sorted_keys(&ho.extra)).into()
            );
        }
    }
    for (i, ch) in root.ra_channel.iter().enumerate() {
        if !ch.extra.is_empty() {
            return Err(format!(
                "Unrecognized fields in ra_channel[{}]: {:?}",
                i,
                sorted_keys(&ch.extra)
            )
            .into());
        }
    }
    if let Some(ref llc) = root.llc {
        if !llc.extra.is_empty() {
            return Err(format!("Unrecognized fields in llc: {:?}", sorted_keys(&llc.extra)).into());
        }
    }
    if let Some(ref rm) = root.rm {
        if !rm.extra.is_empty() {
            return Err(format!("Unrecognized fields in rm: {:?}", sorted_keys(&rm.extra)).into());
        }
    }
    if let Some(ref ncc) = root.ncc {
        if !ncc.extra.is_empty() {
            return Err(format!("Unrecognized fields in ncc: {:?}", sorted_keys(&ncc.extra)).into());
        }
    }

    // Build config from required and optional values
    let mut cfg = TerminalConfig::new(root.terminal_id);
    cfg.debug_log = root.debug_log;

    cfg.superframe.frames = root
        .superframe
        .frames
        .into_iter()
        .map(|f| CfgFrame {
            duration: SimTime::from_micros(f.duration_us),
            slot_count: f.slot_count,
        })
        .collect();

    if let Some(sim) = root.sim {
        apply_sim_patch(&mut cfg.sim, sim);
    }
    if let Some(mac) = root.mac {
        apply_mac_patch(&mut cfg.mac, mac);
    }
    if let Some(logon) = root.logon {
        apply_logon_patch(&mut cfg.logon, logon);
    }
    if let Some(ho) = root.handover {
        apply_handover_patch(&mut cfg.handover, ho);
    }
    if !root.ra_channel.is_empty() {
        cfg.ra_channels = root
            .ra_channel
            .into_iter()
            .enumerate()
            .map(|(i, ch)| apply_ra_channel_patch(i as u8, ch))
            .collect();
    }
    if let Some(llc) = root.llc {
        apply_llc_patch(&mut cfg.llc, llc);
    }
    if let Some(rm) = root.rm {
        apply_rm_patch(&mut cfg.rm, rm);
    }
    if let Some(ncc) = root.ncc {
        cfg.ncc = Some(apply_ncc_patch(ncc));
    }

    Ok(SharedConfig::from_config(cfg))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_sim_patch(dst: &mut CfgSim, src: SimDto) {
    dst.seed = src.seed;
    if let Some(v) = src.superframes {
        dst.superframes = v;
    }
    dst.backlog = src
        .backlog
        .into_iter()
        .map(|b| CfgBacklog {
            rc_index: b.rc_index,
            bytes: b.bytes,
        })
        .collect();
}

fn apply_mac_patch(dst: &mut CfgMac, src: MacDto) {
    if let Some(v) = src.guard_time_us {
        dst.guard_time = SimTime::from_micros(v);
    }
    if let Some(v) = src.timing_advance_us {
        dst.timing_advance = SimTime::from_micros(v);
    }
    if let Some(v) = src.assigned_ra_channel {
        dst.assigned_ra_channel = v;
    }
    if let Some(v) = src.logon_channel {
        dst.logon_channel = v;
    }
    if let Some(v) = src.crdsa_only_for_control {
        dst.crdsa_only_for_control = v;
    }
    if let Some(v) = src.initial_beam_id {
        dst.initial_beam_id = v;
    }
}

fn apply_logon_patch(dst: &mut CfgLogon, src: LogonDto) {
    if let Some(v) = src.enabled {
        dst.enabled = v;
    }
    if let Some(v) = src.window_init_ms {
        dst.window_init = SimTime::from_millis(v);
    }
    if let Some(v) = src.max_waiting_time_ms {
        dst.max_waiting_time = SimTime::from_millis(v);
    }
}

fn apply_handover_patch(dst: &mut CfgHandover, src: HandoverDto) {
    if let Some(v) = src.enabled {
        dst.enabled = v;
    }
    if let Some(v) = src.max_messages_sent {
        dst.max_messages_sent = v;
    }
    if let Some(v) = src.target_beam {
        dst.target_beam = v;
    }
    if let Some(v) = src.degrade_after_ms {
        dst.degrade_after = Some(SimTime::from_millis(v));
    }
}

fn apply_ra_channel_patch(channel_id: u8, src: RaChannelDto) -> AllocationChannelConfig {
    let mut dst = AllocationChannelConfig {
        channel_id,
        frame_index: src.frame_index,
        ..Default::default()
    };

    if let Some(v) = src.slotted_aloha_allowed {
        dst.slotted_aloha_allowed = v;
    }
    if let Some(v) = src.crdsa_allowed {
        dst.crdsa_allowed = v;
    }
    if let Some(v) = src.essa_allowed {
        dst.essa_allowed = v;
    }
    if let Some(v) = src.payload_bytes {
        dst.payload_bytes = v;
    }
    if let Some(v) = src.crdsa_min_randomization {
        dst.crdsa_min_randomization_value = v;
    }
    if let Some(v) = src.crdsa_max_randomization {
        dst.crdsa_max_randomization_value = v;
    }
    if let Some(v) = src.crdsa_num_of_instances {
        dst.crdsa_num_of_instances = v;
    }
    if let Some(v) = src.crdsa_max_unique_payloads_per_block {
        dst.crdsa_max_unique_payload_per_block = v;
    }
    if let Some(v) = src.crdsa_max_consecutive_blocks_accessed {
        dst.crdsa_max_consecutive_blocks_accessed = v;
    }
    if let Some(v) = src.crdsa_min_idle_blocks {
        dst.crdsa_min_idle_blocks = v;
    }
    if let Some(v) = src.crdsa_backoff_time_ms {
        dst.crdsa_backoff_time = SimTime::from_millis(v);
    }
    if let Some(v) = src.crdsa_backoff_persistence {
        dst.crdsa_backoff_probability = AllocationChannelConfig::derive_crdsa_backoff_probability(v);
    }
    if let Some(v) = src.fsim_backoff_time_ms {
        dst.fsim_backoff_time = SimTime::from_millis(v);
    }
    if let Some(v) = src.fsim_persistence {
        dst.fsim_backoff_probability = AllocationChannelConfig::derive_fsim_backoff_probability(v);
    }
    if let Some(v) = src.essa_packet_interval_ms {
        dst.essa_packet_interval = SimTime::from_millis(v);
    }

    dst
}

fn apply_llc_patch(dst: &mut CfgLlc, src: LlcDto) {
    if let Some(v) = src.rc_count {
        dst.rc_count = v;
    }
    if let Some(v) = src.max_queue_bytes {
        dst.max_queue_bytes = v;
    }
}

fn apply_rm_patch(dst: &mut CfgRm, src: RmDto) {
    if let Some(v) = src.enabled {
        dst.enabled = v;
    }
    if let Some(v) = src.evaluation_interval_ms {
        dst.evaluation_interval = SimTime::from_millis(v);
    }
}

fn apply_ncc_patch(src: NccDto) -> CfgNcc {
    let mut dst = CfgNcc::default();
    if let Some(v) = src.logon_response_delay_ms {
        dst.logon_response_delay = SimTime::from_millis(v);
    }
    if let Some(v) = src.tbtp_interval_superframes {
        dst.tbtp_interval_superframes = v;
    }
    if let Some(v) = src.slots_per_tbtp {
        dst.slots_per_tbtp = v;
    }
    if let Some(v) = src.bytes_per_slot {
        dst.bytes_per_slot = v;
    }
    dst
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    terminal_id: u32,
    debug_log: Option<String>,

    #[serde(default)]
    sim: Option<SimDto>,

    superframe: SuperframeDto,

    #[serde(default)]
    mac: Option<MacDto>,

    #[serde(default)]
    logon: Option<LogonDto>,

    #[serde(default)]
    handover: Option<HandoverDto>,

    #[serde(default)]
    ra_channel: Vec<RaChannelDto>,

    #[serde(default)]
    llc: Option<LlcDto>,

    #[serde(default)]
    rm: Option<RmDto>,

    #[serde(default)]
    ncc: Option<NccDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SimDto {
    pub seed: Option<u64>,
    pub superframes: Option<u64>,

    #[serde(default)]
    pub backlog: Vec<BacklogDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct BacklogDto {
    pub rc_index: u8,
    pub bytes: u32,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SuperframeDto {
    pub frames: Vec<FrameDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct FrameDto {
    pub duration_us: u64,
    pub slot_count: u16,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct MacDto {
    pub guard_time_us: Option<u64>,
    pub timing_advance_us: Option<u64>,
    pub assigned_ra_channel: Option<u8>,
    pub logon_channel: Option<u8>,
    pub crdsa_only_for_control: Option<bool>,
    pub initial_beam_id: Option<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct LogonDto {
    pub enabled: Option<bool>,
    pub window_init_ms: Option<u64>,
    pub max_waiting_time_ms: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct HandoverDto {
    pub enabled: Option<bool>,
    pub max_messages_sent: Option<u32>,
    pub target_beam: Option<u32>,
    pub degrade_after_ms: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RaChannelDto {
    pub frame_index: usize,

    pub slotted_aloha_allowed: Option<bool>,
    pub crdsa_allowed: Option<bool>,
    pub essa_allowed: Option<bool>,

    pub payload_bytes: Option<u32>,

    pub crdsa_min_randomization: Option<u16>,
    pub crdsa_max_randomization: Option<u16>,
    pub crdsa_num_of_instances: Option<u32>,
    pub crdsa_max_unique_payloads_per_block: Option<u32>,
    pub crdsa_max_consecutive_blocks_accessed: Option<u32>,
    pub crdsa_min_idle_blocks: Option<u32>,
    pub crdsa_backoff_time_ms: Option<u64>,
    pub crdsa_backoff_persistence: Option<u16>,

    pub fsim_backoff_time_ms: Option<u64>,
    pub fsim_persistence: Option<u16>,

    pub essa_packet_interval_ms: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct LlcDto {
    pub rc_count: Option<u8>,
    pub max_queue_bytes: Option<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RmDto {
    pub enabled: Option<bool>,
    pub evaluation_interval_ms: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct NccDto {
    pub logon_response_delay_ms: Option<u64>,
    pub tbtp_interval_superframes: Option<u32>,
    pub slots_per_tbtp: Option<u16>,
    pub bytes_per_slot: Option<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}
