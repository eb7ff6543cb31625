// Copyright (c) 2023 Oasis Protocol Foundation

//! Signer configuration, parsed from `key=value;key=value` strings
//!
//! Supported keys (case-insensitive):
//! - `address`, bech32 address of the device at the listing path
//! - `wallet_id`, 6 character hex wallet ID of the device
//! - `index`, account index appended to each role path
//!
//! One of `address` or `wallet_id` is required along with `index`.

use std::str::FromStr;

use crate::{locator::Selector, wallet::WalletId};

/// Signer configuration error
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed k/v pair: '{0}'")]
    MalformedPair(String),

    #[error("{0} already configured")]
    DuplicateKey(String),

    #[error("unknown configuration option: '{0}'")]
    UnknownKey(String),

    #[error("malformed index: '{0}'")]
    MalformedIndex(String),

    #[error("malformed wallet ID: '{0}'")]
    MalformedWalletId(String),

    #[error("address and wallet_id are mutually exclusive")]
    ConflictingSelector,

    #[error("{0} not configured")]
    MissingKey(&'static str),
}

/// Signer configuration
#[derive(Clone, Debug, PartialEq)]
pub struct SignerConfig {
    /// Device selector
    pub selector: Selector,
    /// Account index
    pub index: u32,
}

impl FromStr for SignerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mut address, mut wallet_id, mut index) = (None, None, None);

        // Empty strings contain no pairs
        let pairs = s.split(';').filter(|_| !s.is_empty());

        for kv in pairs {
            let (k, v) = match kv.split('=').collect::<Vec<_>>()[..] {
                [k, v] => (k, v),
                _ => return Err(ConfigError::MalformedPair(kv.to_string())),
            };

            match k.to_lowercase().as_str() {
                "address" if address.is_some() => {
                    return Err(ConfigError::DuplicateKey("address".to_string()))
                }
                "address" => address = Some(v.to_string()),
                "wallet_id" if wallet_id.is_some() => {
                    return Err(ConfigError::DuplicateKey("wallet_id".to_string()))
                }
                "wallet_id" => {
                    let w = WalletId::from_str(v)
                        .map_err(|_| ConfigError::MalformedWalletId(v.to_string()))?;
                    wallet_id = Some(w);
                }
                "index" if index.is_some() => {
                    return Err(ConfigError::DuplicateKey("index".to_string()))
                }
                "index" => index = Some(parse_index(v)?),
                _ => return Err(ConfigError::UnknownKey(k.to_string())),
            }
        }

        let selector = match (address, wallet_id) {
            (Some(a), None) => Selector::Address(a),
            (None, Some(w)) => Selector::WalletId(w),
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSelector),
            (None, None) => return Err(ConfigError::MissingKey("address")),
        };

        let index = index.ok_or(ConfigError::MissingKey("index"))?;

        Ok(Self { selector, index })
    }
}

/// Parse an unsigned decimal index, rejecting signs and whitespace
fn parse_index(v: &str) -> Result<u32, ConfigError> {
    if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::MalformedIndex(v.to_string()));
    }

    u32::from_str(v).map_err(|_| ConfigError::MalformedIndex(v.to_string()))
}
