// Copyright (c) 2023 Oasis Protocol Foundation

//! BIP-0044 style derivation path encoding
//!
//! ## Encoding
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |H|                         PURPOSE                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |H|                        COIN_TYPE                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |H|                         ACCOUNT                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |H|                          CHANGE                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |H|                          INDEX                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//! Each element is a little-endian `u32`, `H` marks the hardened bit.

use core::fmt;

use encdec::{DecodeOwned, Encode};

use crate::{ApduError, PATH_PURPOSE_CONSENSUS};

/// Number of elements in a derivation path
pub const PATH_ELEMENTS: usize = 5;

/// Encoded derivation path length
pub const PATH_LEN: usize = PATH_ELEMENTS * 4;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// Derivation path with the number of leading elements to be hardened on the wire
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct DerivationPath {
    elements: [u32; PATH_ELEMENTS],
    harden_count: usize,
}

impl DerivationPath {
    /// Create a fully hardened path, as used for all device operations
    pub const fn new(elements: [u32; PATH_ELEMENTS]) -> Self {
        Self {
            elements,
            harden_count: PATH_ELEMENTS,
        }
    }

    /// Set the number of leading elements to harden (clamped to the path length)
    pub fn with_harden_count(mut self, harden_count: usize) -> Self {
        self.harden_count = harden_count.min(PATH_ELEMENTS);
        self
    }

    /// Path elements (without hardened bits)
    pub fn elements(&self) -> &[u32; PATH_ELEMENTS] {
        &self.elements
    }

    /// Number of leading hardened elements
    pub fn harden_count(&self) -> usize {
        self.harden_count
    }

    /// Derivation purpose (first path element)
    pub fn purpose(&self) -> u32 {
        self.elements[0]
    }

    /// Whether this path addresses a consensus (validator) key
    pub fn is_consensus(&self) -> bool {
        self.purpose() == PATH_PURPOSE_CONSENSUS
    }

    /// Encode path to the fixed 20 byte wire format
    pub fn to_bytes(&self) -> [u8; PATH_LEN] {
        let mut buff = [0u8; PATH_LEN];

        for (i, e) in self.elements.iter().enumerate() {
            let v = match i < self.harden_count {
                true => *e | HARDENED,
                false => *e,
            };
            buff[i * 4..][..4].copy_from_slice(&v.to_le_bytes());
        }

        buff
    }
}

/// Encode a raw path with the provided harden count
pub fn encode_path(path: &[u32], harden_count: usize) -> Result<[u8; PATH_LEN], ApduError> {
    let p = DerivationPath::try_from(path)?;
    Ok(p.with_harden_count(harden_count).to_bytes())
}

impl TryFrom<&[u32]> for DerivationPath {
    type Error = ApduError;

    fn try_from(path: &[u32]) -> Result<Self, Self::Error> {
        let elements: [u32; PATH_ELEMENTS] = path
            .try_into()
            .map_err(|_| ApduError::MalformedPath(path.len()))?;

        Ok(Self::new(elements))
    }
}

impl From<[u32; PATH_ELEMENTS]> for DerivationPath {
    fn from(elements: [u32; PATH_ELEMENTS]) -> Self {
        Self::new(elements)
    }
}

impl AsRef<[u32]> for DerivationPath {
    fn as_ref(&self) -> &[u32] {
        &self.elements
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for (i, e) in self.elements.iter().enumerate() {
            match i < self.harden_count {
                true => write!(f, "/{e}'")?,
                false => write!(f, "/{e}")?,
            }
        }
        Ok(())
    }
}

impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(PATH_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < PATH_LEN {
            return Err(ApduError::InvalidLength);
        }

        buff[..PATH_LEN].copy_from_slice(&self.to_bytes());

        Ok(PATH_LEN)
    }
}

impl DecodeOwned for DerivationPath {
    type Output = Self;

    type Error = ApduError;

    /// Decode a path, stripping hardened bits and counting leading hardened elements
    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() != PATH_LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut elements = [0u32; PATH_ELEMENTS];
        let mut harden_count = 0;

        for (i, e) in elements.iter_mut().enumerate() {
            let mut b = [0u8; 4];
            b.copy_from_slice(&buff[i * 4..][..4]);

            let v = u32::from_le_bytes(b);
            if v & HARDENED != 0 && harden_count == i {
                harden_count += 1;
            }

            *e = v & !HARDENED;
        }

        Ok((
            Self {
                elements,
                harden_count,
            },
            PATH_LEN,
        ))
    }
}
