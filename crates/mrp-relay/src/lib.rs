//! # mrp-relay
//!
//! Both legs of the MRP proxy at the byte level.
//!
//! This crate provides:
//! - Varint-length framing with per-leg encryption state
//! - The app-leg dispatcher that answers pairing and device-info locally
//! - The paired device leg and its relay task
//! - The TCP listener serving app connections

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod server;
pub mod session;
pub mod traits;
pub mod upstream;
mod varint;

pub use codec::Frame;
pub use config::{ProxyConfig, USAGE};
pub use dispatch::{Dispatcher, ProxyContext};
pub use server::RelayServer;
pub use session::{LegSession, DEFAULT_MAX_FRAME_LEN};
pub use traits::Upstream;
pub use upstream::{UpstreamConnection, UpstreamHandle};
