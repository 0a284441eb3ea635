pub mod request_manager;

pub use request_manager::RequestManager;
