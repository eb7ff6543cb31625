// Copyright (c) 2023 Oasis Protocol Foundation

//! Command building and response decoding
//!
//! ## Command encoding
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      CLA      |      INS      |      P1       |      P2       |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      LEN      |                  PAYLOAD...                   /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use encdec::DecodeOwned;
use ledger_apdu::APDUCommand;

use crate::{
    chunk::Chunk,
    path::{DerivationPath, PATH_LEN},
    ApduError, Instruction,
};

/// Command header length
pub const HEADER_LEN: usize = 5;

/// Maximum command payload length
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Ed25519 public key length
pub const PUBLIC_KEY_LEN: usize = 32;

/// Minimum GetAddrEd25519 response length (public key and a non-trivial address)
pub const ADDRESS_RESP_MIN_LEN: usize = 39;

/// `P1` for address requests displayed on the device
pub const P1_CONFIRM: u8 = 0x01;

/// `P1` for silent address requests
pub const P1_SILENT: u8 = 0x00;

/// Success
pub const SW_OK: u16 = 0x9000;

/// `APDU_CODE_DATA_INVALID`, referenced data reversibly blocked (invalidated)
pub const SW_DATA_INVALID: u16 = 0x6984;

/// `APDU_CODE_COMMAND_NOT_ALLOWED`, request rejected on device
pub const SW_COMMAND_NOT_ALLOWED: u16 = 0x6986;

/// `APDU_CODE_BAD_KEY_HANDLE`, the parameters in the data field are incorrect
pub const SW_BAD_KEY_HANDLE: u16 = 0x6A80;

/// Oasis app command
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Command {
    pub cla: u8,
    pub ins: Instruction,
    pub p1: u8,
    pub p2: u8,
    payload: Vec<u8>,
}

impl Command {
    /// Create a new command, checking the payload fits the length field
    pub fn new(
        cla: u8,
        ins: Instruction,
        p1: u8,
        p2: u8,
        payload: Vec<u8>,
    ) -> Result<Self, ApduError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ApduError::PayloadTooLarge(payload.len()));
        }

        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            payload,
        })
    }

    /// Version request (no payload)
    pub fn get_version(cla: u8) -> Self {
        Self {
            cla,
            ins: Instruction::GetVersion,
            p1: 0,
            p2: 0,
            payload: vec![],
        }
    }

    /// Public key / address request for the provided path
    pub fn get_address(cla: u8, path: &DerivationPath, require_confirmation: bool) -> Self {
        Self {
            cla,
            ins: Instruction::GetAddrEd25519,
            p1: confirm_p1(require_confirmation),
            p2: 0,
            payload: path.to_bytes().to_vec(),
        }
    }

    /// Public key / address request with a length-prefixed human readable prefix
    pub fn get_address_with_prefix(
        cla: u8,
        hrp: &str,
        path: &DerivationPath,
        require_confirmation: bool,
    ) -> Result<Self, ApduError> {
        let hrp = hrp.as_bytes();
        if hrp.len() + 1 + PATH_LEN > MAX_PAYLOAD_LEN {
            return Err(ApduError::PayloadTooLarge(hrp.len() + 1 + PATH_LEN));
        }

        let mut payload = Vec::with_capacity(1 + hrp.len() + PATH_LEN);
        payload.push(hrp.len() as u8);
        payload.extend_from_slice(hrp);
        payload.extend_from_slice(&path.to_bytes());

        Self::new(
            cla,
            Instruction::GetAddrEd25519,
            confirm_p1(require_confirmation),
            0,
            payload,
        )
    }

    /// Signing request for a single chunk
    pub fn sign_chunk(cla: u8, chunk: &Chunk) -> Result<Self, ApduError> {
        Self::new(
            cla,
            Instruction::SignEd25519,
            chunk.kind as u8,
            0,
            chunk.data.clone(),
        )
    }

    /// Command payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode header and payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(HEADER_LEN + self.payload.len());

        b.extend_from_slice(&[
            self.cla,
            self.ins as u8,
            self.p1,
            self.p2,
            self.payload.len() as u8,
        ]);
        b.extend_from_slice(&self.payload);

        b
    }

    /// Borrow as an [APDUCommand] for use with a transport
    pub fn apdu(&self) -> APDUCommand<&[u8]> {
        APDUCommand {
            cla: self.cla,
            ins: self.ins as u8,
            p1: self.p1,
            p2: self.p2,
            data: &self.payload[..],
        }
    }
}

fn confirm_p1(require_confirmation: bool) -> u8 {
    match require_confirmation {
        true => P1_CONFIRM,
        false => P1_SILENT,
    }
}

/// Device status word classification
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Status {
    /// Command succeeded
    Ok,
    /// Device rejected malformed input data
    BadParameters,
    /// Device replay / invalidation guard tripped
    DataInvalidated,
    /// Operator declined on-device
    UserRejected,
    /// Any other status word
    Other(u16),
}

impl From<u16> for Status {
    fn from(sw: u16) -> Self {
        match sw {
            SW_OK => Status::Ok,
            SW_BAD_KEY_HANDLE => Status::BadParameters,
            SW_DATA_INVALID => Status::DataInvalidated,
            SW_COMMAND_NOT_ALLOWED => Status::UserRejected,
            _ => Status::Other(sw),
        }
    }
}

/// GetAddrEd25519 response
///
/// ## Encoding
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                           PUBLIC_KEY                          /
/// /                     (32-byte ed25519 key)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    ADDRESS (remaining bytes)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AddressResp {
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub address: String,
}

impl DecodeOwned for AddressResp {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < ADDRESS_RESP_MIN_LEN {
            return Err(ApduError::TruncatedResponse {
                expected: ADDRESS_RESP_MIN_LEN,
                actual: buff.len(),
            });
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&buff[..PUBLIC_KEY_LEN]);

        let address = core::str::from_utf8(&buff[PUBLIC_KEY_LEN..]).map_err(|_| ApduError::Utf8)?;

        Ok((
            Self {
                public_key,
                address: address.to_string(),
            },
            buff.len(),
        ))
    }
}
