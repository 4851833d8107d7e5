//! Async service layer shared by hosts

mod sync;

pub use sync::SyncService;
