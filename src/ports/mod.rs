//! Port traits: the interfaces the simulation core needs from the outside.

pub mod config_port;
pub mod data_port;
pub mod snapshot_port;
