pub mod handover;
pub mod logon;
pub mod random_access;
pub mod slot_tracker;
pub mod tbtp;
pub mod ut_mac;

pub use ut_mac::UtMac;
