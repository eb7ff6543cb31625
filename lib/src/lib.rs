// Copyright (c) 2023 Oasis Protocol Foundation

//! Ledger Oasis API Library (and CLI)
//!
//! Provides [AppSession] for talking to a connected Oasis app,
//! [DeviceLocator] for discovering devices and [LedgerSigner] for
//! role-based signing over a set of sessions.

use std::fmt::{Debug, Display};

pub use ledger_transport::Exchange;

use async_trait::async_trait;

/// Re-export transports for consumer use
pub mod transport;

/// Re-export `ledger-oasis-apdu` for consumers
pub use ledger_oasis_apdu::{self as apdu};

mod address;
pub use address::{AddressCodec, AddressError, Bech32Codec, ADDRESS_HRP};

mod config;
pub use config::{ConfigError, SignerConfig};

mod error;
pub use error::{DeviceStatus, Error};

mod locator;
pub use locator::{AppInfo, DeviceLocator, Selector};

mod session;
pub use session::AppSession;

mod signer;
pub use signer::{prepare_context, LedgerSigner, RootPaths, SignerRole};

mod wallet;
pub use wallet::{MalformedWalletId, WalletId};

/// Provider trait for device enumeration and connection
///
/// This abstracts over physical transports so discovery and
/// signing may be exercised against a mock device.
#[async_trait]
pub trait Provider {
    /// Device information for listing, used by connect
    type Info: Debug + Display + Send + Sync;

    /// Transport returned for connected devices
    type Transport: Exchange + Send + Sync;

    /// List available devices
    async fn list_devices(&self) -> Vec<Self::Info>;

    /// Connect to the specified device
    async fn connect(&self, info: &Self::Info) -> Result<Self::Transport, Error>;
}
