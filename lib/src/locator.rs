// Copyright (c) 2023 Oasis Protocol Foundation

//! Device discovery and selection

use std::{convert::Infallible, fmt, str::FromStr};

use log::{debug, info};

use ledger_oasis_apdu::{
    command::AddressResp,
    path::DerivationPath,
    version::{AppMode, VersionInfo, MIN_REQUIRED_VERSION},
    LISTING_PATH,
};

use crate::{AppSession, Error, Provider, WalletId};

/// Device selector, used to pick a device by address or wallet ID
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Selector {
    /// Match any device
    Any,
    /// Match a device by address
    Address(String),
    /// Match a device by wallet ID
    WalletId(WalletId),
}

impl Selector {
    /// Check whether an address response matches the selector
    pub fn matches(&self, a: &AddressResp) -> bool {
        match self {
            Selector::Any => true,
            Selector::Address(addr) => &a.address == addr,
            Selector::WalletId(w) => &WalletId::from_public_key(&a.public_key) == w,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Any => write!(f, "any"),
            Selector::Address(a) => write!(f, "address: {a}"),
            Selector::WalletId(w) => write!(f, "wallet ID: {w}"),
        }
    }
}

/// Parse a selector, where wallet IDs are 6 hex characters and
/// anything else is treated as an address
impl FromStr for Selector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "any" {
            return Ok(Selector::Any);
        }

        match WalletId::from_str(s) {
            Ok(w) => Ok(Selector::WalletId(w)),
            Err(_) => Ok(Selector::Address(s.to_string())),
        }
    }
}

/// Application information for listing
#[derive(Clone, PartialEq, Debug)]
pub struct AppInfo {
    /// Device description
    pub device: String,
    /// Application version
    pub version: VersionInfo,
    /// Wallet ID for the key at the listing path
    pub wallet_id: WalletId,
    /// Address for the key at the listing path
    pub address: String,
}

/// Device locator, finds and opens [AppSession]s using a [Provider]
pub struct DeviceLocator<P> {
    p: P,
}

impl<P> DeviceLocator<P>
where
    P: Provider + Send + Sync,
    <P::Transport as ledger_transport::Exchange>::Error: std::error::Error + Send + Sync + 'static,
{
    /// Create a new locator using the provided provider
    pub fn new(p: P) -> Self {
        Self { p }
    }

    /// Fetch the underlying provider
    pub fn provider(&self) -> &P {
        &self.p
    }

    /// Open the first device matching the provided selector, for use with keys at `path`
    ///
    /// Selectors are matched against the key at [LISTING_PATH] so wallet IDs and
    /// addresses from [DeviceLocator::list_apps] apply to any account index or role.
    /// The app mode (and class byte) is determined by the purpose of `path`.
    pub async fn find_by_selector(
        &self,
        selector: &Selector,
        path: &DerivationPath,
    ) -> Result<AppSession<P::Transport>, Error> {
        let mode = AppMode::for_path(path);
        let listing = DerivationPath::new(LISTING_PATH);

        debug!("Searching for device ({selector}, path: {path}, mode: {mode})");

        for d in self.p.list_devices().await {
            let mut s = match self.p.connect(&d).await {
                Ok(t) => AppSession::new(t, mode),
                Err(e) => {
                    debug!("Skipping device {d}: connect failed: {e}");
                    continue;
                }
            };

            let a = match s.get_address(&listing, false).await {
                Ok(a) => a,
                Err(e) => {
                    debug!("Skipping device {d}: address request failed: {e}");
                    s.close();
                    continue;
                }
            };

            if !selector.matches(&a) {
                debug!("Skipping device {d}: address {} does not match", a.address);
                s.close();
                continue;
            }

            info!("Using device {d} (address: {})", a.address);

            return Ok(s);
        }

        Err(Error::NoDeviceFound)
    }

    /// Open the first device running a supported app version
    pub async fn find_first_compatible(&self) -> Result<AppSession<P::Transport>, Error> {
        debug!("Searching for compatible device (min version: {MIN_REQUIRED_VERSION})");

        for d in self.p.list_devices().await {
            let mut s = match self.p.connect(&d).await {
                Ok(t) => AppSession::new(t, AppMode::Unknown),
                Err(e) => {
                    debug!("Skipping device {d}: connect failed: {e}");
                    continue;
                }
            };

            match s.check_version(MIN_REQUIRED_VERSION).await {
                Ok(v) => {
                    info!("Using device {d} (version: {v}, mode: {})", v.mode);
                    return Ok(s);
                }
                Err(e) => {
                    debug!("Skipping device {d}: {e}");
                    s.close();
                }
            }
        }

        Err(Error::NoDeviceFound)
    }

    /// List applications on available devices with the key at `path`
    pub async fn list_apps(&self, path: &DerivationPath) -> Vec<AppInfo> {
        let mode = AppMode::for_path(path);
        let mut apps = vec![];

        for d in self.p.list_devices().await {
            let mut s = match self.p.connect(&d).await {
                Ok(t) => AppSession::new(t, mode),
                Err(e) => {
                    debug!("Skipping device {d}: connect failed: {e}");
                    continue;
                }
            };

            // Fetch address before version, as the version response may change the mode
            let r = match s.get_address(path, false).await {
                Ok(a) => s.get_version().await.map(|v| (a, v)),
                Err(e) => Err(e),
            };
            s.close();

            match r {
                Ok((a, version)) => apps.push(AppInfo {
                    device: d.to_string(),
                    version,
                    wallet_id: WalletId::from_public_key(&a.public_key),
                    address: a.address,
                }),
                Err(e) => debug!("Skipping device {d}: {e}"),
            }
        }

        debug!("Found {} apps: {:?}", apps.len(), apps);

        apps
    }
}
