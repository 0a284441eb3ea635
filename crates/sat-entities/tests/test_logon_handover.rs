mod common;

use common::{default_test_config, ComponentTest};
use sat_core::debug;
use sat_core::sat_entities::SatEntity;
use sat_core::SimTime;
use sat_entities::mac::handover::HandoverState;
use sat_entities::mac::UtMac;
use sat_entities::ncc::{gw_address_for_beam, NccSim};
use sat_entities::phy::UserPhy;

fn all_entities() -> Vec<SatEntity> {
    vec![
        SatEntity::Phy,
        SatEntity::Llc,
        SatEntity::Mac,
        SatEntity::Rm,
        SatEntity::Ncc,
    ]
}

/// A hub answering slower than the retry timeout forces repeat requests.
#[test]
fn slow_hub_draws_logon_retries() {
    debug::setup_logging_verbose();

    let mut config = default_test_config();
    config.logon.enabled = true;
    config.logon.window_init = SimTime::from_millis(100);
    config.logon.max_waiting_time = SimTime::from_millis(50);
    config.ncc.as_mut().unwrap().logon_response_delay = SimTime::from_millis(120);
    let mut test = ComponentTest::new(config);
    test.populate_entities(all_entities(), vec![]);

    test.run_stack(Some(SimTime::from_millis(600)));

    assert!(test.config.state_read().logged_on);

    let mac: &UtMac = test.entity(SatEntity::Mac);
    assert!(mac.logon().is_logged_on());
    assert_eq!(mac.logon().retries_sent(), 0);

    let phy: &UserPhy = test.entity(SatEntity::Phy);
    assert!(phy.stats().logon_bursts >= 2);

    let ncc: &NccSim = test.entity(SatEntity::Ncc);
    assert!(ncc.stats().logon_requests_received >= 2);
    assert_eq!(ncc.logged_terminals(), [1]);
}

/// Logon, beam degradation, recommendation, TIM-U switch order and the
/// TBTP that releases the suppressed terminal on the new beam.
#[test]
fn degraded_beam_is_left_after_the_switch_order() {
    debug::setup_logging_verbose();

    let mut config = default_test_config();
    config.logon.enabled = true;
    config.logon.window_init = SimTime::from_millis(100);
    config.logon.max_waiting_time = SimTime::from_millis(50);
    config.rm.enabled = false;
    config.mac.initial_beam_id = 1;
    config.handover.enabled = true;
    config.handover.max_messages_sent = 3;
    config.handover.target_beam = 2;
    config.handover.degrade_after = Some(SimTime::from_millis(350));
    let mut test = ComponentTest::new(config);
    test.populate_entities(all_entities(), vec![]);

    test.run_stack(Some(SimTime::from_millis(800)));

    let state = test.config.state_read().clone();
    assert!(state.logged_on);
    assert_eq!(state.current_beam, 2);

    let mac: &UtMac = test.entity(SatEntity::Mac);
    assert!(mac.logon().is_logged_on());
    assert_eq!(mac.handover().state(), HandoverState::NoHandover);
    assert_eq!(mac.handover().first_transmittable_superframe_id(), None);
    assert_eq!(mac.handover().target_beam(), None);
    assert_eq!(mac.gw_address(), Some(gw_address_for_beam(2)));

    let phy: &UserPhy = test.entity(SatEntity::Phy);
    assert_eq!(phy.beam_id(), 2);
    assert!(phy.stats().logon_bursts >= 1);
    // Exactly one recommendation leaves, the resend is cancelled by the
    // switch order before its slot comes up.
    assert_eq!(phy.stats().slotted_aloha_bursts, 1);
    assert_eq!(phy.stats().da_bursts, 0);
    assert_eq!(phy.stats().crdsa_bursts, 0);

    let ncc: &NccSim = test.entity(SatEntity::Ncc);
    assert_eq!(ncc.stats().recommendations_received, 1);
    assert!(ncc.stats().tbtps_sent >= 1);
    assert_eq!(ncc.logged_terminals(), [1]);
}
