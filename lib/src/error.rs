// Copyright (c) 2023 Oasis Protocol Foundation

use ledger_oasis_apdu::{
    version::{VersionInfo, VersionRequired},
    ApduError,
};
use ledger_transport::APDUAnswer;

use crate::{AddressError, ConfigError, SignerRole};

/// Ledger Oasis API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Derivation path length invalid
    #[error("Derivation path should contain 5 elements (found {0})")]
    MalformedPath(usize),

    /// Signing context exceeds the one byte length prefix
    #[error("Maximum supported context size is 255 bytes (found {0})")]
    ContextTooLarge(usize),

    /// Empty signing context
    #[error("Malformed signing context")]
    MalformedContext,

    /// Chunk size of zero
    #[error("Chunk size must be non-zero")]
    InvalidChunkSize,

    /// Command payload exceeds 255 bytes
    #[error("Command payload exceeds 255 bytes (found {0})")]
    PayloadTooLarge(usize),

    /// Device response too short for the request
    #[error("Truncated response (expected at least {expected} bytes, found {actual})")]
    TruncatedResponse { expected: usize, actual: usize },

    /// Device response could not be decoded
    #[error("Invalid response encoding")]
    InvalidEncoding,

    /// Device rejected the request parameters
    #[error("Bad key handle: {0}")]
    BadParameters(String),

    /// Device invalidated the referenced data
    #[error("Data is invalid: {0}")]
    DataInvalidated(String),

    /// User denied operation
    #[error("Command not allowed: sign request rejected")]
    UserRejected,

    /// Application older than the supported minimum
    #[error("App version required {required} - version found: {found}")]
    VersionTooOld {
        required: VersionInfo,
        found: VersionInfo,
    },

    /// No device matched the request
    #[error("No compatible device found")]
    NoDeviceFound,

    /// Role not configured for or supported by the signer
    #[error("Role {0} is not supported by signer")]
    UnsupportedRole(SignerRole),

    /// Role configured but not loaded
    #[error("Device for role {0} unavailable")]
    DeviceUnavailable(SignerRole),

    /// Device returned an invalid ed25519 key
    #[error("Device returned malformed public key")]
    MalformedPublicKey,

    /// Device address does not match the public key encoding
    #[error("Address mismatch (device: {device}, expected: {expected})")]
    AddressMismatch { device: String, expected: String },

    /// Address codec error
    #[error("Address codec error: {0}")]
    Address(#[from] AddressError),

    /// Invalid signer configuration
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] ConfigError),

    /// Transport or device error
    #[error("Transport error {0}")]
    Transport(anyhow::Error),
}

impl Error {
    /// Check whether the operation was declined on the device
    /// (as opposed to failing)
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, Error::UserRejected)
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::MalformedPath(n) => Error::MalformedPath(n),
            ApduError::ContextTooLarge(n) => Error::ContextTooLarge(n),
            ApduError::InvalidChunkSize => Error::InvalidChunkSize,
            ApduError::PayloadTooLarge(n) => Error::PayloadTooLarge(n),
            ApduError::TruncatedResponse { expected, actual } => {
                Error::TruncatedResponse { expected, actual }
            }
            ApduError::InvalidLength | ApduError::InvalidEncoding | ApduError::Utf8 => {
                Error::InvalidEncoding
            }
        }
    }
}

impl From<VersionRequired> for Error {
    fn from(e: VersionRequired) -> Self {
        Error::VersionTooOld {
            required: e.required,
            found: e.found,
        }
    }
}

impl From<DeviceStatus> for Error {
    fn from(e: DeviceStatus) -> Self {
        Error::Transport(anyhow::Error::new(e))
    }
}

#[cfg(feature = "transport_hid")]
impl From<ledger_transport_hid::LedgerHIDError> for Error {
    fn from(e: ledger_transport_hid::LedgerHIDError) -> Self {
        Error::Transport(anyhow::Error::new(e).context("HID"))
    }
}

#[cfg(feature = "transport_hid")]
impl From<hidapi::HidError> for Error {
    fn from(e: hidapi::HidError) -> Self {
        Error::Transport(anyhow::anyhow!("could not create HidApi instance: {}", e))
    }
}

/// Unexpected device status word
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Device status 0x{code:04x}: {description}")]
pub struct DeviceStatus {
    pub code: u16,
    pub description: String,
}

impl DeviceStatus {
    /// Build a status error from an APDU answer
    pub fn from_answer<B: std::ops::Deref<Target = [u8]>>(a: &APDUAnswer<B>) -> Self {
        let description = match a.error_code() {
            Ok(c) => c.description(),
            Err(_) => "[APDU_ERROR] Unknown".to_string(),
        };

        Self {
            code: a.retcode(),
            description,
        }
    }
}
