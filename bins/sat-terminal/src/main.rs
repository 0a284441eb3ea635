use clap::Parser;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sat_config::{toml_config, SharedConfig};
use sat_core::debug;
use sat_core::sat_common::Sap;
use sat_core::sat_entities::SatEntity;
use sat_core::SimTime;
use sat_entities::llc::UtLlc;
use sat_entities::mac::handover::ScriptedBeamAuthority;
use sat_entities::mac::UtMac;
use sat_entities::ncc::NccSim;
use sat_entities::phy::UserPhy;
use sat_entities::rm::RequestManager;
use sat_entities::MessageRouter;
use sat_saps::llc::LlcEnqueueReq;
use sat_saps::{SapMsg, SapMsgInner};

/// Superframe sequence used for the return link.
const RETURN_LINK_SEQ: u8 = 0;

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

/// Assemble the terminal stack and its hub-side counterpart.
fn build_terminal_stack(cfg: &SharedConfig) -> MessageRouter {
    let mut router = MessageRouter::new(cfg.clone());

    let conf = cfg.config();
    let authority = ScriptedBeamAuthority::new(
        conf.mac.initial_beam_id,
        conf.handover.target_beam,
        conf.handover.degrade_after,
    );

    let phy = UserPhy::new(cfg.clone());
    let llc = UtLlc::new(cfg.clone());
    let mac = UtMac::new(cfg.clone(), Box::new(authority));
    let rm = RequestManager::new(cfg.clone());
    let ncc = NccSim::new(cfg.clone());
    router.register_entity(Box::new(phy));
    router.register_entity(Box::new(llc));
    router.register_entity(Box::new(mac));
    router.register_entity(Box::new(rm));
    router.register_entity(Box::new(ncc));

    // Preloaded send buffers, queued ahead of the first superframe
    for entry in &conf.sim.backlog {
        router.submit_message(SapMsg {
            sap: Sap::LlcSap,
            src: SatEntity::Llc,
            dest: SatEntity::Llc,
            t_submit: SimTime::ZERO,
            msg: SapMsgInner::LlcEnqueueReq(LlcEnqueueReq {
                rc_index: entry.rc_index,
                bytes: entry.bytes,
            }),
        });
    }

    router
}

fn print_summary(router: &mut MessageRouter) {
    println!("Simulation ended at {}", router.now());
    if let Some(entity) = router.get_entity(SatEntity::Phy) {
        if let Some(phy) = entity.as_any().downcast_ref::<UserPhy>() {
            let s = phy.stats();
            println!(
                "  terminal tx: {} DA, {} slotted aloha, {} CRDSA, {} ESSA, {} logon burst(s), {} bytes",
                s.da_bursts,
                s.slotted_aloha_bursts,
                s.crdsa_bursts,
                s.essa_bursts,
                s.logon_bursts,
                s.tx_bytes
            );
        }
    }
    if let Some(entity) = router.get_entity(SatEntity::Ncc) {
        if let Some(ncc) = entity.as_any().downcast_ref::<NccSim>() {
            let s = ncc.stats();
            println!(
                "  hub rx: {} burst(s), {} data bytes, {} unique CRDSA packet(s), {} TBTP(s) sent",
                s.bursts_received,
                s.data_bytes_received,
                ncc.unique_crdsa_packets(),
                s.tbtps_sent
            );
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Satellite return-link terminal simulator",
    long_about = "Runs the return-link MAC stack of one user terminal against a simulated hub, driven by the provided TOML configuration"
)]
struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with superframe/channel parameters")]
    config: String,

    /// Override the configured number of superframes to run
    #[arg(long)]
    superframes: Option<u64>,
}

fn main() {
    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let seq = match cfg.config().superframe_seq() {
        Ok(seq) => seq,
        Err(e) => {
            println!("Invalid superframe configuration: {:?}", e);
            std::process::exit(1);
        }
    };
    let superframes = args.superframes.unwrap_or(cfg.config().sim.superframes);
    let until = seq.superframe_duration(RETURN_LINK_SEQ) * superframes;

    let mut router = build_terminal_stack(&cfg);

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    tracing::info!("Running {} superframe(s), until {}", superframes, until);
    router.run_stack(Some(until), Some(running));

    print_summary(&mut router);
}
