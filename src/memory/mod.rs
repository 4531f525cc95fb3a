pub mod backend;
pub mod bundle;
pub mod history;
pub mod markers;
pub mod seed;
pub mod store;
pub mod triggers;
pub mod types;
