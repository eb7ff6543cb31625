// Copyright (c) 2023 Oasis Protocol Foundation

//! Wallet identifiers, a short fingerprint of a device public key

use std::{fmt, str::FromStr};

use sha2::{Digest, Sha512_256};

/// Wallet ID length in bytes (the text form is twice this)
pub const WALLET_ID_LEN: usize = 3;

/// Wallet ID computed as a truncated SHA-512/256 hash of a public key
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct WalletId([u8; WALLET_ID_LEN]);

/// Wallet ID could not be parsed
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Malformed wallet ID '{0}'")]
pub struct MalformedWalletId(pub String);

impl WalletId {
    /// Compute the wallet ID for a public key
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let h = Sha512_256::digest(public_key);

        let mut id = [0u8; WALLET_ID_LEN];
        id.copy_from_slice(&h[..WALLET_ID_LEN]);

        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; WALLET_ID_LEN] {
        &self.0
    }
}

impl From<[u8; WALLET_ID_LEN]> for WalletId {
    fn from(b: [u8; WALLET_ID_LEN]) -> Self {
        Self(b)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for WalletId {
    type Err = MalformedWalletId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; WALLET_ID_LEN];

        hex::decode_to_slice(s, &mut b).map_err(|_| MalformedWalletId(s.to_string()))?;

        Ok(Self(b))
    }
}
