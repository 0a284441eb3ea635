pub mod ncc_sim;

pub use ncc_sim::{NccSim, gw_address_for_beam};
