//! Proxy configuration.

use crate::session::DEFAULT_MAX_FRAME_LEN;
use mrp_core::device::{ADVERTISED_UNIQUE_ID, PROXY_NAME, SYSTEM_BUILD_VERSION};
use mrp_core::error::ConfigError;
use mrp_core::DeviceIdentity;
use mrp_pairing::{Credentials, PairingConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const USAGE: &str = "mrp-proxy <credentials> <local ip> <device ip> <device port> <identifier>";

/// Number of positional arguments.
const ARG_COUNT: usize = 5;

/// Everything needed to start the proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Pairing with the genuine device.
    pub credentials: Credentials,
    /// Address published in the discovery record.
    pub local_ip: IpAddr,
    pub device_addr: SocketAddr,
    /// Identifier of the genuine device, presented as the proxy's own.
    pub identifier: DeviceIdentity,
    pub listen_addr: SocketAddr,
    pub name: String,
    pub build: String,
    pub advertised_id: String,
    pub max_frame_len: usize,
    pub pairing: PairingConfig,
}

impl ProxyConfig {
    pub fn new(
        credentials: Credentials,
        local_ip: IpAddr,
        device_addr: SocketAddr,
        identifier: DeviceIdentity,
    ) -> Self {
        Self {
            credentials,
            local_ip,
            device_addr,
            identifier,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            name: PROXY_NAME.to_string(),
            build: SYSTEM_BUILD_VERSION.to_string(),
            advertised_id: ADVERTISED_UNIQUE_ID.to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            pairing: PairingConfig::default(),
        }
    }

    /// Build from `<credentials> <local ip> <device ip> <device port> <identifier>`.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<I::Item> = args.into_iter().collect();
        if args.len() != ARG_COUNT {
            return Err(ConfigError::ArgumentCount {
                expected: ARG_COUNT,
                actual: args.len(),
            });
        }

        let credentials: Credentials = args[0].as_ref().parse()?;
        let local_ip: IpAddr = args[1]
            .as_ref()
            .parse()
            .map_err(|e| ConfigError::InvalidArgument {
                name: "local ip",
                reason: format!("{}", e),
            })?;
        let device_ip: IpAddr = args[2]
            .as_ref()
            .parse()
            .map_err(|e| ConfigError::InvalidArgument {
                name: "device ip",
                reason: format!("{}", e),
            })?;
        let device_port: u16 = args[3]
            .as_ref()
            .parse()
            .map_err(|e| ConfigError::InvalidArgument {
                name: "device port",
                reason: format!("{}", e),
            })?;
        let identifier = args[4].as_ref();
        if identifier.is_empty() {
            return Err(ConfigError::InvalidArgument {
                name: "identifier",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self::new(
            credentials,
            local_ip,
            SocketAddr::new(device_ip, device_port),
            DeviceIdentity::new(identifier),
        ))
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    pub fn with_pairing(mut self, pairing: PairingConfig) -> Self {
        self.pairing = pairing;
        self
    }
}
