//! lanwake: a minimal HTTP API that wakes allowlisted machines on the
//! local network with Wake-on-LAN magic packets.

pub mod api;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod machine;
pub mod metrics;
pub mod packet;
pub mod registry;
pub mod wol;
