//! # mrp-discovery
//!
//! Publishes the proxy as a media remote service on the local network.

mod advertiser;

pub use advertiser::{MdnsAdvertiser, ServiceRecord};

/// Service type apps browse for.
pub const MEDIA_REMOTE_SERVICE_TYPE: &str = "_mediaremotetv._tcp.local.";
