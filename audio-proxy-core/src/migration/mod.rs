pub mod coordinator;
pub mod snapshot;
