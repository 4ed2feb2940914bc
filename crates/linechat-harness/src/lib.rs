//! Deterministic simulation harness for Linechat.
//!
//! Runs the real server and client runtimes over an in-memory network so
//! whole conversations can be scripted and checked without sockets or
//! timing. Delivery failures and broken connections can be injected per
//! client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_network;
pub mod sim_world;

pub use sim_network::{SimClientTransport, SimNetwork, SimServerTransport};
pub use sim_world::SimWorld;
