//! Shared data model for the snmpoll polling engine.
//!
//! Defines the caller-facing types exchanged with the monitoring manager
//! ([`types::NodeSpec`] in, [`types::HostReport`] out) and the layered
//! config-map resolution used by every check mode.

pub mod config;
pub mod types;
