//! Tor daemon configuration and supervision.

pub mod config;
pub mod error;
pub mod supervisor;

pub use config::{
    TorConfig, CONTROL_PORT, DNS_PORT, TORRC_PATH, TRANS_PORT, VIRTUAL_ADDR_NETWORK,
};
pub use error::TorError;
pub use supervisor::{TorSupervisor, TOR_ACCOUNT};
