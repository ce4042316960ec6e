//! Pure Rust async implementation of the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol)
//! as spoken by Project Zomboid servers.
pub mod client;
pub mod config;
pub mod error;
pub mod packet;

pub use client::Client;
pub use config::ClientConfig;
pub use error::RconError;
