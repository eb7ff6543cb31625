// Copyright (c) 2023 Oasis Protocol Foundation

//! Session for a connected Oasis application
//!
//! This provides methods for interacting with the device
//! and is generic over [ledger_transport::Exchange]

use encdec::DecodeOwned;
use ledger_transport::Exchange;
use log::debug;

use ledger_oasis_apdu::{
    chunk::prepare_chunks,
    command::{AddressResp, Command, Status, PUBLIC_KEY_LEN},
    path::{DerivationPath, PATH_ELEMENTS},
    version::{check_version, AppMode, VersionInfo},
    USER_MESSAGE_CHUNK_SIZE,
};

use crate::{DeviceStatus, Error};

/// Oasis app session for a connected device.
///
/// Methods take `&mut self` so requests on a session never interleave.
/// Sessions are consumed by [AppSession::close].
pub struct AppSession<T> {
    /// Transport for communication
    t: T,
    /// Last observed version information, selects the APDU class
    version: VersionInfo,
}

impl<T> AppSession<T> {
    /// Create a session over an open transport in the provided mode
    pub fn new(t: T, mode: AppMode) -> Self {
        Self {
            t,
            version: VersionInfo {
                mode,
                major: 0,
                minor: 0,
                patch: 0,
            },
        }
    }

    /// Current application mode
    pub fn mode(&self) -> AppMode {
        self.version.mode
    }

    /// Last observed version (zeroed until [AppSession::get_version] is called)
    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    /// Close the session, releasing the transport
    pub fn close(self) {
        debug!("Closing session ({} mode)", self.version.mode);
        drop(self.t)
    }

    fn cla(&self) -> u8 {
        self.version.mode.cla()
    }
}

impl<T> AppSession<T>
where
    T: Exchange + Send + Sync,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    /// Fetch application version
    ///
    /// Note this replaces the stored version _including the mode_,
    /// so subsequent requests use the class byte for the reported mode.
    pub async fn get_version(&mut self) -> Result<VersionInfo, Error> {
        debug!("Requesting app version");

        let r = self.request(&Command::get_version(self.cla())).await?;

        let (v, _) = VersionInfo::decode_owned(&r)?;
        self.version = v;

        Ok(v)
    }

    /// Fetch application version and check it is at least `required`
    pub async fn check_version(&mut self, required: VersionInfo) -> Result<VersionInfo, Error> {
        let found = self.get_version().await?;

        check_version(found, required)?;

        Ok(found)
    }

    /// Fetch the ed25519 public key for the provided path
    pub async fn get_public_key(
        &mut self,
        path: &DerivationPath,
    ) -> Result<[u8; PUBLIC_KEY_LEN], Error> {
        let r = self.get_address(path, false).await?;
        Ok(r.public_key)
    }

    /// Fetch the ed25519 public key and address for the provided path
    pub async fn get_address(
        &mut self,
        path: &DerivationPath,
        require_confirmation: bool,
    ) -> Result<AddressResp, Error> {
        let path = path.with_harden_count(PATH_ELEMENTS);

        debug!("Requesting address for path: {}", path);

        let cmd = Command::get_address(self.cla(), &path, require_confirmation);
        let r = self.request(&cmd).await?;

        let (a, _) = AddressResp::decode_owned(&r)?;

        Ok(a)
    }

    /// Display the address for the provided path on the device, requiring confirmation
    pub async fn show_address(&mut self, path: &DerivationPath) -> Result<AddressResp, Error> {
        self.get_address(path, true).await
    }

    /// Fetch the public key and address for the provided path, using the provided address prefix
    pub async fn get_address_with_prefix(
        &mut self,
        hrp: &str,
        path: &DerivationPath,
        require_confirmation: bool,
    ) -> Result<AddressResp, Error> {
        let path = path.with_harden_count(PATH_ELEMENTS);

        debug!("Requesting address for path: {} (prefix: {})", path, hrp);

        let cmd = Command::get_address_with_prefix(self.cla(), hrp, &path, require_confirmation)?;
        let r = self.request(&cmd).await?;

        let (a, _) = AddressResp::decode_owned(&r)?;

        Ok(a)
    }

    /// Sign a message with the provided context, returning the raw signature
    pub async fn sign(
        &mut self,
        path: &DerivationPath,
        context: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let path = path.with_harden_count(PATH_ELEMENTS);

        debug!(
            "Signing {} byte message for path: {} (context: {})",
            message.len(),
            path,
            hex::encode(context)
        );

        let chunks = prepare_chunks(&path.to_bytes(), context, message, USER_MESSAGE_CHUNK_SIZE)?;

        let mut resp = vec![];
        for (i, c) in chunks.iter().enumerate() {
            debug!("Sending chunk {}/{} ({})", i + 1, chunks.len(), c.kind);

            let cmd = Command::sign_chunk(self.cla(), c)?;
            resp = self.request(&cmd).await?;
        }

        Ok(resp)
    }

    /// Issue a request and classify the response status
    async fn request(&mut self, cmd: &Command) -> Result<Vec<u8>, Error> {
        debug!("TX: {}", hex::encode(cmd.to_bytes()));

        let a = self
            .t
            .exchange(&cmd.apdu())
            .await
            .map_err(|e| Error::Transport(anyhow::Error::new(e)))?;

        let data = a.data();

        debug!("RX: {} (status: {:04x})", hex::encode(data), a.retcode());

        match Status::from(a.retcode()) {
            Status::Ok => Ok(data.to_vec()),
            Status::BadParameters => Err(Error::BadParameters(
                String::from_utf8_lossy(data).to_string(),
            )),
            Status::DataInvalidated => Err(Error::DataInvalidated(
                String::from_utf8_lossy(data).to_string(),
            )),
            Status::UserRejected => Err(Error::UserRejected),
            Status::Other(_) => Err(DeviceStatus::from_answer(&a).into()),
        }
    }
}
