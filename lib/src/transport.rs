// Copyright (c) 2023 Oasis Protocol Foundation

//! Transport providers for physical devices
//!

#[cfg(feature = "transport_hid")]
pub use hid::*;

#[cfg(feature = "transport_hid")]
mod hid {
    use std::fmt;

    use async_trait::async_trait;
    use hidapi::{DeviceInfo, HidApi};
    use log::debug;

    pub use ledger_transport_hid::{LedgerHIDError, TransportNativeHID};

    use crate::{Error, Provider};

    /// Ledger provider manages HID ledger devices and connections
    pub struct LedgerProvider {
        hid_api: HidApi,
    }

    impl LedgerProvider {
        /// Create a new ledger provider
        /// NOTE: only one provider may exist at a time (workaround for global HID context errors on macos/m1)
        pub fn new() -> Result<Self, Error> {
            Ok(Self {
                hid_api: HidApi::new()?,
            })
        }
    }

    /// Ledger HID device information for listing, used by connect
    #[derive(Clone, Debug)]
    pub struct LedgerInfo(pub DeviceInfo);

    impl fmt::Display for LedgerInfo {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "{:16} (USB, {:04x}:{:04x}, {})",
                self.0.product_string().unwrap_or("UNKNOWN"),
                self.0.vendor_id(),
                self.0.product_id(),
                self.0.serial_number().unwrap_or("UNKNOWN"),
            )
        }
    }

    #[async_trait]
    impl Provider for LedgerProvider {
        type Info = LedgerInfo;

        type Transport = TransportNativeHID;

        async fn list_devices(&self) -> Vec<Self::Info> {
            let devices: Vec<_> = TransportNativeHID::list_ledgers(&self.hid_api)
                .cloned()
                .map(LedgerInfo)
                .collect();

            debug!("Found {} devices: {:?}", devices.len(), devices);

            devices
        }

        async fn connect(&self, info: &Self::Info) -> Result<Self::Transport, Error> {
            let t = TransportNativeHID::open_device(&self.hid_api, &info.0)?;
            Ok(t)
        }
    }
}
