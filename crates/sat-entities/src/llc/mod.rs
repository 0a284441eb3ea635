pub mod llc_queues;
pub mod ut_llc;

pub use ut_llc::UtLlc;
