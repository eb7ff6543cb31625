// Copyright (c) 2023 Oasis Protocol Foundation

//! Role based signer over ledger devices
//!
//! Each [SignerRole] is mapped to a derivation path prefix, with the
//! configured account index appended. Devices are located lazily on
//! [LedgerSigner::load] and public keys are cached once fetched.

use std::collections::HashMap;

use ed25519_dalek::{Signature, VerifyingKey};
use log::debug;

use ledger_oasis_apdu::{
    path::DerivationPath, MAX_CONTEXT_LEN, PATH_COIN_TYPE, PATH_PURPOSE_BIP44,
    PATH_PURPOSE_CONSENSUS, PATH_SUB_PURPOSE_CONSENSUS,
};

use crate::{
    AddressCodec, AppSession, DeviceLocator, Error, Exchange, Provider, Selector, SignerConfig,
};

/// Account index used in root paths
const PATH_ACCOUNT: u32 = 0;

/// External chain
const PATH_CHANGE: u32 = 0;

/// Signer roles
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display, clap::ValueEnum)]
#[non_exhaustive]
pub enum SignerRole {
    Entity,
    Node,
    P2p,
    Consensus,
    Tls,
    Vrf,
}

/// Root path prefixes for signer roles, the account index is appended to these
#[derive(Clone, PartialEq, Debug)]
pub struct RootPaths(HashMap<SignerRole, [u32; 4]>);

impl Default for RootPaths {
    fn default() -> Self {
        let mut m = HashMap::new();

        m.insert(
            SignerRole::Entity,
            [PATH_PURPOSE_BIP44, PATH_COIN_TYPE, PATH_ACCOUNT, PATH_CHANGE],
        );
        m.insert(
            SignerRole::Consensus,
            [
                PATH_PURPOSE_CONSENSUS,
                PATH_COIN_TYPE,
                PATH_SUB_PURPOSE_CONSENSUS,
                PATH_ACCOUNT,
            ],
        );

        Self(m)
    }
}

impl RootPaths {
    /// Set the prefix for a role
    pub fn insert(&mut self, role: SignerRole, prefix: [u32; 4]) {
        self.0.insert(role, prefix);
    }

    /// Fetch the prefix for a role
    pub fn prefix(&self, role: SignerRole) -> Option<&[u32; 4]> {
        self.0.get(&role)
    }

    /// Build the full path for a role and account index
    pub fn path(&self, role: SignerRole, index: u32) -> Option<DerivationPath> {
        let [a, b, c, d] = *self.prefix(role)?;
        Some(DerivationPath::new([a, b, c, d, index]))
    }
}

/// Check a signing context is non-empty and fits the length prefix
pub fn prepare_context(context: &[u8]) -> Result<&[u8], Error> {
    match context.len() {
        0 => Err(Error::MalformedContext),
        n if n > MAX_CONTEXT_LEN => Err(Error::ContextTooLarge(n)),
        _ => Ok(context),
    }
}

/// Per-role signer state
struct RoleSigner<T> {
    path: DerivationPath,
    session: Option<AppSession<T>>,
    public_key: Option<VerifyingKey>,
}

/// Ledger backed signer, mapping [SignerRole]s to device sessions
pub struct LedgerSigner<P: Provider> {
    locator: DeviceLocator<P>,
    selector: Selector,
    inner: HashMap<SignerRole, RoleSigner<P::Transport>>,
    codec: Option<Box<dyn AddressCodec + Send + Sync>>,
}

impl<P> LedgerSigner<P>
where
    P: Provider + Send + Sync,
    <P::Transport as Exchange>::Error: std::error::Error + Send + Sync + 'static,
{
    /// Create a new signer for the provided roles
    ///
    /// No device I/O occurs until [LedgerSigner::load] is called.
    pub fn new(
        provider: P,
        config: &SignerConfig,
        roles: &[SignerRole],
        root_paths: &RootPaths,
    ) -> Result<Self, Error> {
        let mut inner = HashMap::new();

        for role in roles {
            let path = root_paths
                .path(*role, config.index)
                .ok_or(Error::UnsupportedRole(*role))?;

            debug!("Configured role {} with path {}", role, path);

            inner.insert(
                *role,
                RoleSigner {
                    path,
                    session: None,
                    public_key: None,
                },
            );
        }

        Ok(Self {
            locator: DeviceLocator::new(provider),
            selector: config.selector.clone(),
            inner,
            codec: None,
        })
    }

    /// Require device addresses match the codec encoding of fetched public keys
    pub fn with_address_check(mut self, codec: impl AddressCodec + Send + Sync + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// Derivation path for a configured role
    pub fn path(&self, role: SignerRole) -> Option<&DerivationPath> {
        self.inner.get(&role).map(|s| &s.path)
    }

    /// Locate and connect to the device for a role (if not already connected)
    pub async fn load(&mut self, role: SignerRole) -> Result<(), Error> {
        let signer = self
            .inner
            .get_mut(&role)
            .ok_or(Error::UnsupportedRole(role))?;

        if signer.session.is_some() {
            return Ok(());
        }

        let s = self
            .locator
            .find_by_selector(&self.selector, &signer.path)
            .await?;
        signer.session = Some(s);

        Ok(())
    }

    /// Fetch the public key for a role, cached after the first request
    pub async fn public_key(&mut self, role: SignerRole) -> Result<VerifyingKey, Error> {
        let signer = self
            .inner
            .get_mut(&role)
            .ok_or(Error::UnsupportedRole(role))?;

        if let Some(pk) = &signer.public_key {
            return Ok(*pk);
        }

        let s = signer
            .session
            .as_mut()
            .ok_or(Error::DeviceUnavailable(role))?;

        let raw = match &self.codec {
            Some(codec) => {
                let a = s.get_address(&signer.path, false).await?;

                let expected = codec.encode(&a.public_key)?;
                if expected != a.address {
                    return Err(Error::AddressMismatch {
                        device: a.address,
                        expected,
                    });
                }

                a.public_key
            }
            None => s.get_public_key(&signer.path).await?,
        };

        let pk = VerifyingKey::from_bytes(&raw).map_err(|_| Error::MalformedPublicKey)?;
        signer.public_key = Some(pk);

        Ok(pk)
    }

    /// Sign a message with the provided context using the key for a role
    pub async fn sign(
        &mut self,
        role: SignerRole,
        context: &[u8],
        message: &[u8],
    ) -> Result<Signature, Error> {
        let signer = self
            .inner
            .get_mut(&role)
            .ok_or(Error::UnsupportedRole(role))?;

        let s = signer
            .session
            .as_mut()
            .ok_or(Error::DeviceUnavailable(role))?;

        let context = prepare_context(context)?;

        let r = s.sign(&signer.path, context, message).await?;

        Signature::from_slice(&r).map_err(|_| Error::InvalidEncoding)
    }

    /// Close all open sessions
    pub fn close(self) {
        for (role, signer) in self.inner {
            if let Some(s) = signer.session {
                debug!("Closing session for role {}", role);
                s.close();
            }
        }
    }
}
