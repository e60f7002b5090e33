//! # mrp-core
//!
//! Core types and error definitions shared across the MRP proxy crates.
//!
//! This crate provides:
//! - MRP protocol messages and message-type routing
//! - The device identity and device info the proxy presents
//! - Common error types

pub mod device;
pub mod error;
pub mod message;

pub use device::{DeviceIdentity, DeviceInfo};
pub use error::{
    AuthFailure, ConfigError, CryptoError, DecodeError, DiscoveryError, Error, FramingError,
    ProtocolError, Result,
};
pub use message::{MessageType, ProtocolMessage, Route};
