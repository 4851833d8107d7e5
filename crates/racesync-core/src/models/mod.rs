//! Data models for racesync

mod checkpoint;
mod collection;
mod device;
mod imported;
mod race;
mod records;
mod runner;

pub use checkpoint::Checkpoint;
pub use collection::{composite_key, Collection, Entity};
pub use device::{DeviceIdentity, DEVICE_ID_SETTING};
pub use imported::ImportedCheckpointResult;
pub use race::Race;
pub use records::{
    AuditLogEntry, DeletedEntry, StrapperCall, StrapperCallStatus, VetOutRecord, WithdrawalRecord,
};
pub use runner::{BaseStationRunner, CheckpointRunner, Runner, RunnerStatus};
