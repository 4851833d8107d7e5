pub mod checkpoint;
pub mod common;
pub mod device;
pub mod export;
pub mod import;
pub mod preview;
pub mod verify;
