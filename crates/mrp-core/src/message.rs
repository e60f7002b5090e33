//! MRP protocol messages.
//!
//! Only the fields the proxy reads or writes are modelled. The relay always
//! forwards the original plaintext bytes, so fields prost does not know about
//! are never lost on the way through.

use crate::error::DecodeError;

/// Envelope carried by every MRP frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtocolMessage {
    #[prost(enumeration = "MessageType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub identifier: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub authentication_token: Option<String>,
    #[prost(uint64, optional, tag = "4")]
    pub error_code: Option<u64>,
    #[prost(uint64, optional, tag = "5")]
    pub timestamp: Option<u64>,
    #[prost(message, optional, tag = "20")]
    pub device_info_message: Option<DeviceInfoMessage>,
    #[prost(message, optional, tag = "39")]
    pub crypto_pairing_message: Option<CryptoPairingMessage>,
}

/// Identity and capabilities announced by either end of a connection.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceInfoMessage {
    #[prost(string, optional, tag = "1")]
    pub unique_identifier: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub localized_model_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub system_build_version: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub application_bundle_identifier: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub application_bundle_version: Option<String>,
    #[prost(uint32, optional, tag = "7")]
    pub protocol_version: Option<u32>,
    #[prost(uint32, optional, tag = "8")]
    pub last_supported_message_type: Option<u32>,
    #[prost(bool, optional, tag = "9")]
    pub supports_system_pairing: Option<bool>,
    #[prost(bool, optional, tag = "10")]
    pub allows_pairing: Option<bool>,
    #[prost(string, optional, tag = "11")]
    pub system_media_application: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub supports_acl: Option<bool>,
    #[prost(bool, optional, tag = "13")]
    pub supports_shared_queue: Option<bool>,
    #[prost(bool, optional, tag = "14")]
    pub supports_extended_motion: Option<bool>,
    #[prost(bytes = "vec", optional, tag = "15")]
    pub bluetooth_address: Option<Vec<u8>>,
    #[prost(uint32, optional, tag = "16")]
    pub shared_queue_version: Option<u32>,
}

/// Carrier for TLV8 pairing data.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoPairingMessage {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub pairing_data: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "2")]
    pub status: Option<i32>,
    #[prost(bool, optional, tag = "3")]
    pub is_retrying: Option<bool>,
    #[prost(bool, optional, tag = "4")]
    pub is_using_system_pairing: Option<bool>,
    #[prost(int32, optional, tag = "5")]
    pub state: Option<i32>,
}

/// Known MRP message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    UnknownMessage = 0,
    SendCommandMessage = 1,
    SendCommandResultMessage = 2,
    GetStateMessage = 3,
    SetStateMessage = 4,
    SetArtworkMessage = 5,
    RegisterHidDeviceMessage = 6,
    RegisterHidDeviceResultMessage = 7,
    SendHidEventMessage = 8,
    SendHidReportMessage = 9,
    SendVirtualTouchEventMessage = 10,
    NotificationMessage = 11,
    ContentItemsChangedNotificationMessage = 12,
    DeviceInfoMessage = 15,
    ClientUpdatesConfigMessage = 16,
    VolumeControlAvailabilityMessage = 17,
    GameControllerMessage = 18,
    RegisterGameControllerMessage = 19,
    RegisterGameControllerResponseMessage = 20,
    UnregisterGameControllerMessage = 21,
    RegisterForGameControllerEventsMessage = 22,
    KeyboardMessage = 23,
    GetKeyboardSessionMessage = 24,
    TextInputMessage = 25,
    GetVoiceInputDevicesMessage = 26,
    GetVoiceInputDevicesResponseMessage = 27,
    RegisterVoiceInputDeviceMessage = 28,
    RegisterVoiceInputDeviceResponseMessage = 29,
    SetRecordingStateMessage = 30,
    SendVoiceInputMessage = 31,
    PlaybackQueueRequestMessage = 32,
    TransactionMessage = 33,
    CryptoPairingMessage = 34,
    GameControllerPropertiesMessage = 35,
    SetReadyStateMessage = 36,
    DeviceInfoUpdateMessage = 37,
    SetConnectionStateMessage = 38,
    SendButtonEventMessage = 39,
    SetHiliteModeMessage = 40,
    WakeDeviceMessage = 41,
    GenericMessage = 42,
    SendPackedVirtualTouchEventMessage = 43,
    SendLyricsEvent = 44,
    SetNowPlayingClientMessage = 46,
    SetNowPlayingPlayerMessage = 47,
    ModifyOutputContextRequestMessage = 48,
    GetVolumeMessage = 49,
    GetVolumeResultMessage = 50,
    SetVolumeMessage = 51,
    VolumeDidChangeMessage = 52,
    RemoveClientMessage = 53,
    RemovePlayerMessage = 54,
    UpdateClientMessage = 55,
    UpdateContentItemMessage = 56,
    UpdateContentItemArtworkMessage = 57,
    UpdatePlayerMessage = 58,
}

/// Where an inbound app message is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answered locally with the proxy's own device info.
    DeviceInfo,
    /// Fed into the pair-setup or pair-verify machine.
    CryptoPairing,
    /// Relayed to the genuine device untouched.
    Forward,
}

impl ProtocolMessage {
    /// Build an empty message of the given type.
    pub fn of_type(message_type: MessageType) -> Self {
        Self {
            r#type: Some(message_type as i32),
            ..Default::default()
        }
    }

    /// Wrap TLV8 pairing data in a crypto-pairing message.
    pub fn crypto_pairing(pairing_data: Vec<u8>) -> Self {
        Self {
            crypto_pairing_message: Some(CryptoPairingMessage {
                pairing_data: Some(pairing_data),
                status: Some(0),
                ..Default::default()
            }),
            ..Self::of_type(MessageType::CryptoPairingMessage)
        }
    }

    /// Known message type, or `None` for values outside [`MessageType`].
    pub fn message_type(&self) -> Option<MessageType> {
        self.r#type.and_then(|raw| MessageType::try_from(raw).ok())
    }

    /// Raw type tag as carried on the wire.
    pub fn raw_type(&self) -> i32 {
        self.r#type.unwrap_or(MessageType::UnknownMessage as i32)
    }

    /// Decide how an inbound app message is handled.
    pub fn route(&self) -> Route {
        match self.message_type() {
            Some(MessageType::DeviceInfoMessage) => Route::DeviceInfo,
            Some(MessageType::CryptoPairingMessage) => Route::CryptoPairing,
            Some(_) | None => Route::Forward,
        }
    }

    /// Pairing data of a crypto-pairing message.
    pub fn pairing_data(&self) -> Result<&[u8], DecodeError> {
        self.crypto_pairing_message
            .as_ref()
            .and_then(|inner| inner.pairing_data.as_deref())
            .ok_or(DecodeError::MissingField("pairingData"))
    }
}
