pub mod user_phy;

pub use user_phy::UserPhy;
