// Copyright (c) 2023 Oasis Protocol Foundation

//! Application version and mode
//!
//! ## GetVersion response encoding
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     MODE      |     MAJOR     |     MINOR     |     PATCH     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  (reserved)   |
//! +-+-+-+-+-+-+-+-+
//! ```

use core::{cmp::Ordering, fmt};

use encdec::DecodeOwned;
use strum::Display;

use crate::{path::DerivationPath, ApduError, CLA_CONSUMER, CLA_VALIDATOR};

/// Minimum GetVersion response length
pub const VERSION_RESP_LEN: usize = 4;

/// Oldest supported application version
pub const MIN_REQUIRED_VERSION: VersionInfo = VersionInfo {
    mode: AppMode::Unknown,
    major: 0,
    minor: 3,
    patch: 0,
};

/// Application variant, selects the APDU class byte
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum AppMode {
    Validator,
    Consumer,
    Unknown,
}

impl AppMode {
    /// APDU class for this mode, unknown modes talk to the consumer app
    pub const fn cla(&self) -> u8 {
        match self {
            AppMode::Validator => CLA_VALIDATOR,
            AppMode::Consumer | AppMode::Unknown => CLA_CONSUMER,
        }
    }

    /// Select the mode matching a derivation path purpose
    pub fn for_path(path: &DerivationPath) -> Self {
        match path.is_consensus() {
            true => AppMode::Validator,
            false => AppMode::Consumer,
        }
    }
}

impl From<u8> for AppMode {
    fn from(v: u8) -> Self {
        match v {
            1 => AppMode::Validator,
            2 => AppMode::Consumer,
            _ => AppMode::Unknown,
        }
    }
}

/// Application version reported by the device
///
/// Ordering compares only `major.minor.patch`.
#[derive(Copy, Clone, Debug)]
pub struct VersionInfo {
    pub mode: AppMode,
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl VersionInfo {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            mode: AppMode::Unknown,
            major,
            minor,
            patch,
        }
    }

    fn triple(&self) -> (u8, u8, u8) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for VersionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for VersionInfo {}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl DecodeOwned for VersionInfo {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < VERSION_RESP_LEN {
            return Err(ApduError::TruncatedResponse {
                expected: VERSION_RESP_LEN,
                actual: buff.len(),
            });
        }

        Ok((
            Self {
                mode: AppMode::from(buff[0]),
                major: buff[1],
                minor: buff[2],
                patch: buff[3],
            },
            buff.len(),
        ))
    }
}

/// Device application older than required
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("App version required {required} - version found: {found}")]
pub struct VersionRequired {
    pub found: VersionInfo,
    pub required: VersionInfo,
}

/// Check a reported version satisfies the required minimum
pub fn check_version(found: VersionInfo, required: VersionInfo) -> Result<(), VersionRequired> {
    match found >= required {
        true => Ok(()),
        false => Err(VersionRequired { found, required }),
    }
}
