// Copyright (c) 2023 Oasis Protocol Foundation

//! Protocol / APDU definitions for Oasis app communication
//!
//! This module provides the wire format used to talk to the Oasis ledger application,
//! for both the consumer and validator variants of the app.
//!
//! Commands follow the usual APDU layout (`CLA`, `INS`, `P1`, `P2`, `LEN` followed by
//! `LEN` bytes of payload). Derivation paths are encoded as five little-endian `u32`s
//! and signing payloads are streamed to the device in fixed size chunks.
//!

use num_enum::TryFromPrimitive;
use strum::Display;

pub mod chunk;
pub mod command;
pub mod path;
pub mod prelude;
pub mod version;

/// APDU class for the consumer (wallet) application
pub const CLA_CONSUMER: u8 = 0x05;

/// APDU class for the validator application
pub const CLA_VALIDATOR: u8 = 0xF5;

/// Maximum payload carried by each signing chunk
pub const USER_MESSAGE_CHUNK_SIZE: usize = 250;

/// Maximum signing context length (the length is sent as a single byte)
pub const MAX_CONTEXT_LEN: usize = 255;

/// BIP-0044 purpose, used for entity (account) keys
pub const PATH_PURPOSE_BIP44: u32 = 44;

/// Purpose used for consensus keys, matching the validator app
pub const PATH_PURPOSE_CONSENSUS: u32 = 43;

/// Sub-purpose used for consensus keys
pub const PATH_SUB_PURPOSE_CONSENSUS: u32 = 0;

/// SLIP-0044 coin type registered to Oasis
pub const PATH_COIN_TYPE: u32 = 474;

/// Path used to list and connect to devices by address
pub const LISTING_PATH: [u32; 5] = [PATH_PURPOSE_BIP44, PATH_COIN_TYPE, 0, 0, 0];

/// Oasis APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch application version and mode
    GetVersion = 0x00,

    /// Fetch ed25519 public key and address for a derivation path
    GetAddrEd25519 = 0x01,

    /// Stream a context and message for ed25519 signing
    SignEd25519 = 0x02,
}

/// Protocol level errors, raised before or after an exchange with the device
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApduError {
    /// Derivation paths must contain exactly five elements
    #[error("Derivation path should contain 5 elements (found {0})")]
    MalformedPath(usize),

    /// Signing context does not fit in the one byte length prefix
    #[error("Maximum supported context size is 255 bytes (found {0})")]
    ContextTooLarge(usize),

    /// Chunk size of zero
    #[error("Chunk size must be non-zero")]
    InvalidChunkSize,

    /// Command payload does not fit in the one byte length field
    #[error("Command payload exceeds 255 bytes (found {0})")]
    PayloadTooLarge(usize),

    /// Device response shorter than required for the instruction
    #[error("Truncated response (expected at least {expected} bytes, found {actual})")]
    TruncatedResponse { expected: usize, actual: usize },

    /// Buffer length invalid for the object
    #[error("Invalid length")]
    InvalidLength,

    /// Buffer contents invalid for the object
    #[error("Invalid encoding")]
    InvalidEncoding,

    /// Non UTF-8 string in response
    #[error("Invalid UTF-8 string")]
    Utf8,
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            _ => ApduError::InvalidEncoding,
        }
    }
}
