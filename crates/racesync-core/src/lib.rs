//! racesync-core - Core library for racesync
//!
//! This crate contains the models, local store, and synchronization engine
//! used by every racesync station (checkpoints and the base station) to
//! exchange runner data through signed export packages.

pub mod checkpoint_results;
pub mod checksum;
pub mod config;
pub mod conflict;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod package;
pub mod schema;
pub mod services;
pub mod util;

pub use error::{Error, Result};
pub use models::{Collection, DeviceIdentity, Entity, Race, Runner, RunnerStatus};
