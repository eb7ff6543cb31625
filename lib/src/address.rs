// Copyright (c) 2023 Oasis Protocol Foundation

//! Address encoding for device public keys

use bech32::{FromBase32, ToBase32, Variant};

/// Human readable prefix for Oasis addresses
pub const ADDRESS_HRP: &str = "oasis";

/// Address codec error
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("Bech32 error: {0}")]
    Bech32(#[from] bech32::Error),

    #[error("Unexpected address prefix (expected: {expected}, found: {found})")]
    Prefix { expected: String, found: String },
}

/// Codec between public keys and address text
pub trait AddressCodec {
    /// Encode a public key to address text
    fn encode(&self, public_key: &[u8]) -> Result<String, AddressError>;

    /// Decode address text to raw bytes
    fn decode(&self, address: &str) -> Result<Vec<u8>, AddressError>;
}

/// Bech32 address codec over raw public key bytes
#[derive(Clone, PartialEq, Debug)]
pub struct Bech32Codec {
    hrp: String,
}

impl Bech32Codec {
    /// Create a codec with the provided human readable prefix
    pub fn new(hrp: &str) -> Self {
        Self {
            hrp: hrp.to_string(),
        }
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }
}

impl Default for Bech32Codec {
    fn default() -> Self {
        Self::new(ADDRESS_HRP)
    }
}

impl AddressCodec for Bech32Codec {
    fn encode(&self, public_key: &[u8]) -> Result<String, AddressError> {
        let s = bech32::encode(&self.hrp, public_key.to_base32(), Variant::Bech32)?;
        Ok(s)
    }

    fn decode(&self, address: &str) -> Result<Vec<u8>, AddressError> {
        let (hrp, data, _variant) = bech32::decode(address)?;

        if hrp != self.hrp {
            return Err(AddressError::Prefix {
                expected: self.hrp.clone(),
                found: hrp,
            });
        }

        let b = Vec::<u8>::from_base32(&data)?;

        Ok(b)
    }
}
