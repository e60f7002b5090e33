//! mDNS advertisement of the proxy.

use crate::MEDIA_REMOTE_SERVICE_TYPE;
use mdns_sd::{ServiceDaemon, ServiceInfo};
use mrp_core::device::{ADVERTISED_UNIQUE_ID, PROXY_NAME, SYSTEM_BUILD_VERSION};
use mrp_core::error::{DiscoveryError, Result};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// What the proxy publishes about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub unique_identifier: String,
    pub build: String,
    pub ip: IpAddr,
    pub port: u16,
}

impl ServiceRecord {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self {
            name: PROXY_NAME.to_string(),
            unique_identifier: ADVERTISED_UNIQUE_ID.to_string(),
            build: SYSTEM_BUILD_VERSION.to_string(),
            ip,
            port,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_unique_identifier(mut self, id: impl Into<String>) -> Self {
        self.unique_identifier = id.into();
        self
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = build.into();
        self
    }

    /// TXT properties in publication order.
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("AllowPairing", "YES".to_string()),
            ("Name", self.name.clone()),
            ("UniqueIdentifier", self.unique_identifier.clone()),
            ("SystemBuildVersion", self.build.clone()),
        ]
    }

    /// mDNS host name derived from the instance name.
    pub fn host_name(&self) -> String {
        let label: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("{}.local.", label)
    }

    fn to_service_info(&self) -> Result<ServiceInfo> {
        let properties: HashMap<String, String> = self
            .properties()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let info = ServiceInfo::new(
            MEDIA_REMOTE_SERVICE_TYPE,
            &self.name,
            &self.host_name(),
            self.ip,
            self.port,
            properties,
        )
        .map_err(|e| DiscoveryError::Registration(format!("Invalid service record: {}", e)))?;
        Ok(info)
    }
}

/// Owns the mDNS daemon for as long as the proxy is advertised.
pub struct MdnsAdvertiser {
    daemon: ServiceDaemon,
    fullname: String,
}

impl MdnsAdvertiser {
    /// Start a daemon and register the record.
    pub fn publish(record: &ServiceRecord) -> Result<Self> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| DiscoveryError::Daemon(format!("Failed to create mDNS daemon: {}", e)))?;

        let info = record.to_service_info()?;
        let fullname = info.get_fullname().to_string();
        daemon
            .register(info)
            .map_err(|e| DiscoveryError::Registration(format!("{}: {}", fullname, e)))?;

        info!(
            service = %fullname,
            ip = %record.ip,
            port = record.port,
            "advertising proxy"
        );
        Ok(Self { daemon, fullname })
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// Withdraw the record and stop the daemon.
    pub fn shutdown(self) -> Result<()> {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            warn!(service = %self.fullname, error = %e, "unregister failed");
        }
        self.daemon
            .shutdown()
            .map_err(|e| DiscoveryError::Daemon(format!("Failed to stop mDNS daemon: {}", e)))?;
        debug!(service = %self.fullname, "advertisement withdrawn");
        Ok(())
    }
}
