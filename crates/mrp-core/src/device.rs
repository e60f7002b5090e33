//! Identity the proxy presents to the app, and the device info it answers with.

use crate::message::{DeviceInfoMessage, MessageType, ProtocolMessage};

/// Advertised name of the proxy.
pub const PROXY_NAME: &str = "ATVProxy";
/// System build reported to the app.
pub const SYSTEM_BUILD_VERSION: &str = "15K600";
/// Unique identifier published in the discovery record.
pub const ADVERTISED_UNIQUE_ID: &str = "4d797fd3-3538-427e-a47b-a32fc6cf3a69";

/// Opaque identifier of the genuine device, presented as our own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(Vec<u8>);

impl DeviceIdentity {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy string form for protobuf string fields.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// Fixed answer to device-info requests on the app leg.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub unique_identifier: DeviceIdentity,
    pub name: String,
    pub system_build_version: String,
    pub application_bundle_identifier: String,
    pub protocol_version: u32,
    pub last_supported_message_type: u32,
    pub system_media_application: String,
    pub shared_queue_version: u32,
}

impl DeviceInfo {
    /// Device info of a media box with the given identity.
    pub fn media_device(identity: DeviceIdentity) -> Self {
        Self {
            unique_identifier: identity,
            name: PROXY_NAME.to_string(),
            system_build_version: SYSTEM_BUILD_VERSION.to_string(),
            application_bundle_identifier: "com.apple.mediaremoted".to_string(),
            protocol_version: 1,
            last_supported_message_type: MessageType::UpdatePlayerMessage as u32,
            system_media_application: "com.apple.TVMusic".to_string(),
            shared_queue_version: 2,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.system_build_version = build.into();
        self
    }

    /// Response to a device-info request, echoing its identifier.
    pub fn response_to(&self, request: &ProtocolMessage) -> ProtocolMessage {
        let inner = DeviceInfoMessage {
            unique_identifier: Some(self.unique_identifier.to_string_lossy()),
            name: Some(self.name.clone()),
            system_build_version: Some(self.system_build_version.clone()),
            application_bundle_identifier: Some(self.application_bundle_identifier.clone()),
            protocol_version: Some(self.protocol_version),
            last_supported_message_type: Some(self.last_supported_message_type),
            supports_system_pairing: Some(true),
            allows_pairing: Some(true),
            system_media_application: Some(self.system_media_application.clone()),
            supports_acl: Some(true),
            supports_shared_queue: Some(true),
            supports_extended_motion: Some(true),
            shared_queue_version: Some(self.shared_queue_version),
            ..Default::default()
        };

        ProtocolMessage {
            identifier: request.identifier.clone(),
            device_info_message: Some(inner),
            ..ProtocolMessage::of_type(MessageType::DeviceInfoMessage)
        }
    }
}

/// Device info the proxy sends when it connects to the genuine device as a controller.
pub fn controller_device_info(name: &str, identifier: &str) -> ProtocolMessage {
    let inner = DeviceInfoMessage {
        unique_identifier: Some(identifier.to_string()),
        name: Some(name.to_string()),
        localized_model_name: Some("iPhone".to_string()),
        system_build_version: Some("14G60".to_string()),
        application_bundle_identifier: Some("com.apple.TVRemote".to_string()),
        application_bundle_version: Some("273.12".to_string()),
        protocol_version: Some(1),
        last_supported_message_type: Some(MessageType::UpdatePlayerMessage as u32),
        supports_extended_motion: Some(true),
        ..Default::default()
    };

    ProtocolMessage {
        device_info_message: Some(inner),
        ..ProtocolMessage::of_type(MessageType::DeviceInfoMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_echoes_request_identifier() {
        let info = DeviceInfo::media_device(DeviceIdentity::new(b"ABCD".to_vec()));
        let mut request = ProtocolMessage::of_type(MessageType::DeviceInfoMessage);
        request.identifier = Some("req-7".to_string());

        let response = info.response_to(&request);
        assert_eq!(response.identifier.as_deref(), Some("req-7"));
        assert_eq!(response.message_type(), Some(MessageType::DeviceInfoMessage));
    }

    #[test]
    fn response_carries_fixed_fields() {
        let info = DeviceInfo::media_device(DeviceIdentity::new(b"ABCD".to_vec()));
        let response = info.response_to(&ProtocolMessage::default());
        let inner = response.device_info_message.unwrap();

        assert_eq!(inner.unique_identifier.as_deref(), Some("ABCD"));
        assert_eq!(inner.name.as_deref(), Some("ATVProxy"));
        assert_eq!(inner.system_build_version.as_deref(), Some("15K600"));
        assert_eq!(
            inner.application_bundle_identifier.as_deref(),
            Some("com.apple.mediaremoted")
        );
        assert_eq!(inner.protocol_version, Some(1));
        assert_eq!(inner.last_supported_message_type, Some(58));
        assert_eq!(inner.supports_system_pairing, Some(true));
        assert_eq!(inner.allows_pairing, Some(true));
        assert_eq!(inner.system_media_application.as_deref(), Some("com.apple.TVMusic"));
        assert_eq!(inner.supports_acl, Some(true));
        assert_eq!(inner.supports_shared_queue, Some(true));
        assert_eq!(inner.supports_extended_motion, Some(true));
        assert_eq!(inner.shared_queue_version, Some(2));
        assert_eq!(inner.bluetooth_address, None);
    }

    #[test]
    fn builder_overrides_name_and_build() {
        let info = DeviceInfo::media_device(DeviceIdentity::new(b"X".to_vec()))
            .with_name("Den")
            .with_build("17J586");
        assert_eq!(info.name, "Den");
        assert_eq!(info.system_build_version, "17J586");
    }

    #[test]
    fn controller_info_identifies_as_remote_app() {
        let msg = controller_device_info("Proxy", "client-1");
        let inner = msg.device_info_message.unwrap();
        assert_eq!(inner.unique_identifier.as_deref(), Some("client-1"));
        assert_eq!(
            inner.application_bundle_identifier.as_deref(),
            Some("com.apple.TVRemote")
        );
        assert_eq!(msg.identifier, None);
    }
}
