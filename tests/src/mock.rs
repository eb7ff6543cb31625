// Copyright (c) 2023 Oasis Protocol Foundation

//! Mock Oasis app for exercising sessions, discovery and signing
//! without hardware.
//!
//! Keys are either served from the [crate::vectors::KEY_TABLE]
//! (public keys only, signing unsupported) or derived from a seed
//! for each path (supporting signing).

use std::{
    fmt,
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use encdec::DecodeOwned;
use log::debug;
use sha2::{Digest, Sha512_256};

use ledger_transport::{APDUAnswer, APDUCommand, Exchange};

use ledger_oasis::{AddressCodec, Bech32Codec, Error, Provider};
use ledger_oasis_apdu::{
    chunk::ChunkKind,
    command::{
        ADDRESS_RESP_MIN_LEN, SW_BAD_KEY_HANDLE, SW_COMMAND_NOT_ALLOWED, SW_DATA_INVALID, SW_OK,
    },
    path::{DerivationPath, PATH_LEN},
    version::VERSION_RESP_LEN,
    Instruction, CLA_CONSUMER, CLA_VALIDATOR,
};

use crate::vectors::key_vector;

/// Default mock version response (unknown mode, v0.13.0)
pub const MOCK_VERSION: [u8; 5] = [0x00, 0x00, 0x0d, 0x00, 0x00];

/// CLA not supported
pub const SW_CLA_NOT_SUPPORTED: u16 = 0x6E00;

/// INS not supported
pub const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;

/// Mock key source
#[derive(Clone, PartialEq, Debug)]
pub enum MockKeys {
    /// Serve public keys from the test vector table
    Table,
    /// Derive signing keys from a seed and the requested path
    Seed([u8; 32]),
}

/// Mock transport error
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MockError {
    #[error("mock device disconnected")]
    Disconnected,
    #[error("invalid mock answer")]
    InvalidAnswer,
}

#[derive(Default)]
struct MockState {
    /// Encoded commands received
    commands: Vec<Vec<u8>>,
    /// Pending signing request (path and body)
    signing: Option<(DerivationPath, Vec<u8>)>,
    /// Open transports
    open: usize,
    /// Number of closed transports
    closed: usize,
    disconnected: bool,
}

/// Mock Oasis ledger device
pub struct MockDevice {
    name: String,
    keys: MockKeys,
    version: [u8; 5],
    reject_signing: bool,
    invalidate_signing: bool,
    truncate: bool,
    state: Mutex<MockState>,
}

impl MockDevice {
    /// Create a mock device serving keys from the test vector table
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keys: MockKeys::Table,
            version: MOCK_VERSION,
            reject_signing: false,
            invalidate_signing: false,
            truncate: false,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Create a mock device deriving keys from the provided seed
    pub fn with_seed(name: &str, seed: [u8; 32]) -> Self {
        Self {
            keys: MockKeys::Seed(seed),
            ..Self::new(name)
        }
    }

    /// Set the GetVersion response (`[mode, major, minor, patch, ..]`)
    pub fn version(mut self, version: [u8; 5]) -> Self {
        self.version = version;
        self
    }

    /// Reject all signing requests as if declined by the user
    pub fn reject_signing(mut self) -> Self {
        self.reject_signing = true;
        self
    }

    /// Fail signing requests with `DATA_INVALID` once the final chunk is received
    pub fn invalidate_signing(mut self) -> Self {
        self.invalidate_signing = true;
        self
    }

    /// Return version and address responses one byte short of the minimum length
    pub fn truncate_responses(mut self) -> Self {
        self.truncate = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate transport failure for subsequent exchanges
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state().disconnected = disconnected;
    }

    /// Fetch encoded commands received by the device
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state().commands.clone()
    }

    /// Number of currently open transports
    pub fn open(&self) -> usize {
        self.state().open
    }

    /// Number of transports closed
    pub fn closed(&self) -> usize {
        self.state().closed
    }

    /// Compute the signing key for a path (seeded devices only)
    pub fn signing_key(&self, path: &DerivationPath) -> Option<SigningKey> {
        let seed = match &self.keys {
            MockKeys::Seed(s) => s,
            MockKeys::Table => return None,
        };

        let mut h = Sha512_256::new();
        h.update(seed);
        h.update(path.elements().map(u32::to_le_bytes).concat());

        Some(SigningKey::from_bytes(&h.finalize().into()))
    }

    /// Compute the public key and address for a path
    pub fn address(&self, path: &DerivationPath) -> Option<([u8; 32], String)> {
        match &self.keys {
            MockKeys::Table => {
                let v = key_vector(path.elements()[4])?;
                Some((v.public_key(), v.address.to_string()))
            }
            MockKeys::Seed(_) => {
                let pk = self.signing_key(path)?.verifying_key().to_bytes();
                let address = Bech32Codec::default().encode(&pk).ok()?;
                Some((pk, address))
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // Recover from poisoning so a failed test does not cascade
        match self.state.lock() {
            Ok(s) => s,
            Err(e) => e.into_inner(),
        }
    }

    /// Handle an APDU, returning response data and status word
    fn handle(&self, cla: u8, ins: u8, p1: u8, p2: u8, data: &[u8]) -> (Vec<u8>, u16) {
        let mut encoded = vec![cla, ins, p1, p2, data.len() as u8];
        encoded.extend_from_slice(data);
        self.state().commands.push(encoded);

        if cla != CLA_CONSUMER && cla != CLA_VALIDATOR {
            return (vec![], SW_CLA_NOT_SUPPORTED);
        }

        let (mut r, sw, min_len) = match Instruction::try_from(ins) {
            Ok(Instruction::GetVersion) => (self.version.to_vec(), SW_OK, VERSION_RESP_LEN),
            Ok(Instruction::GetAddrEd25519) => {
                let (r, sw) = self.on_get_address(data);
                (r, sw, ADDRESS_RESP_MIN_LEN)
            }
            Ok(Instruction::SignEd25519) => {
                let (r, sw) = self.on_sign(p1, data);
                (r, sw, 0)
            }
            Err(_) => (vec![], SW_INS_NOT_SUPPORTED, 0),
        };

        if self.truncate && sw == SW_OK && min_len > 0 {
            r.truncate(min_len - 1);
        }

        (r, sw)
    }

    fn on_get_address(&self, data: &[u8]) -> (Vec<u8>, u16) {
        // Strip optional length-prefixed address prefix
        let path = match data.len() {
            PATH_LEN => data,
            n if n > PATH_LEN && data[0] as usize + 1 + PATH_LEN == n => &data[1 + data[0] as usize..],
            _ => return (b"invalid path length".to_vec(), SW_BAD_KEY_HANDLE),
        };

        let path = match DerivationPath::decode_owned(path) {
            Ok((p, _)) => p,
            Err(_) => return (b"invalid path".to_vec(), SW_BAD_KEY_HANDLE),
        };

        match self.address(&path) {
            Some((pk, address)) => {
                let mut r = pk.to_vec();
                r.extend_from_slice(address.as_bytes());
                (r, SW_OK)
            }
            None => (
                format!("no key for index: {}", path.elements()[4]).into_bytes(),
                SW_BAD_KEY_HANDLE,
            ),
        }
    }

    fn on_sign(&self, p1: u8, data: &[u8]) -> (Vec<u8>, u16) {
        let kind = match ChunkKind::try_from(p1) {
            Ok(k) => k,
            Err(_) => return (b"invalid chunk".to_vec(), SW_BAD_KEY_HANDLE),
        };

        let mut state = self.state();

        match kind {
            ChunkKind::Init => {
                let path = match DerivationPath::decode_owned(data) {
                    Ok((p, _)) => p,
                    Err(_) => return (b"invalid path".to_vec(), SW_BAD_KEY_HANDLE),
                };
                state.signing = Some((path, vec![]));
                return (vec![], SW_OK);
            }
            ChunkKind::Add | ChunkKind::Last => match state.signing.as_mut() {
                Some((_, body)) => body.extend_from_slice(data),
                None => return (b"no signing request".to_vec(), SW_DATA_INVALID),
            },
        }

        if kind == ChunkKind::Add {
            return (vec![], SW_OK);
        }

        let (path, body) = match state.signing.take() {
            Some(v) => v,
            None => return (b"no signing request".to_vec(), SW_DATA_INVALID),
        };
        drop(state);

        if self.reject_signing {
            return (vec![], SW_COMMAND_NOT_ALLOWED);
        }
        if self.invalidate_signing {
            return (b"signing request invalidated".to_vec(), SW_DATA_INVALID);
        }

        // Split length-prefixed context and message
        let context_len = match body.first() {
            Some(n) => *n as usize,
            None => return (b"empty request".to_vec(), SW_DATA_INVALID),
        };
        if body.len() < 1 + context_len {
            return (b"invalid context".to_vec(), SW_DATA_INVALID);
        }
        let (context, message) = body[1..].split_at(context_len);

        let k = match self.signing_key(&path) {
            Some(k) => k,
            None => return (b"signing unsupported".to_vec(), SW_INS_NOT_SUPPORTED),
        };

        debug!(
            "Mock signing {} byte message for path {} (context: {})",
            message.len(),
            path,
            hex::encode(context)
        );

        let mut h = Sha512_256::new();
        h.update(context);
        h.update(message);

        let sig = k.sign(&h.finalize());

        (sig.to_bytes().to_vec(), SW_OK)
    }
}

/// Transport for a [MockDevice], marking the device closed on drop
pub struct MockTransport {
    d: Arc<MockDevice>,
}

impl MockTransport {
    pub fn new(d: Arc<MockDevice>) -> Self {
        d.state().open += 1;
        Self { d }
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        let mut s = self.d.state();
        s.open -= 1;
        s.closed += 1;
    }
}

#[async_trait]
impl Exchange for MockTransport {
    type Error = MockError;

    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        if self.d.state().disconnected {
            return Err(MockError::Disconnected);
        }

        let (mut r, sw) = self.d.handle(
            command.cla,
            command.ins,
            command.p1,
            command.p2,
            &command.data,
        );
        r.extend_from_slice(&sw.to_be_bytes());

        APDUAnswer::from_answer(r).map_err(|_| MockError::InvalidAnswer)
    }
}

/// Mock device information for listing
#[derive(Clone, Debug, PartialEq)]
pub struct MockInfo {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for MockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:16} (Mock, {})", self.name, self.index)
    }
}

/// Provider over a set of [MockDevice]s
#[derive(Default)]
pub struct MockProvider {
    devices: Vec<Arc<MockDevice>>,
    unavailable: Vec<usize>,
}

impl MockProvider {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices: devices.into_iter().map(Arc::new).collect(),
            unavailable: vec![],
        }
    }

    /// Mark a device as failing to connect
    pub fn unavailable(mut self, index: usize) -> Self {
        self.unavailable.push(index);
        self
    }

    /// Fetch a device handle (for inspection)
    pub fn device(&self, index: usize) -> Arc<MockDevice> {
        self.devices[index].clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Info = MockInfo;

    type Transport = MockTransport;

    async fn list_devices(&self) -> Vec<Self::Info> {
        self.devices
            .iter()
            .enumerate()
            .map(|(index, d)| MockInfo {
                index,
                name: d.name.clone(),
            })
            .collect()
    }

    async fn connect(&self, info: &Self::Info) -> Result<Self::Transport, Error> {
        if self.unavailable.contains(&info.index) {
            return Err(Error::Transport(anyhow::anyhow!(
                "mock device {} unavailable",
                info
            )));
        }

        let d = self
            .devices
            .get(info.index)
            .ok_or(Error::NoDeviceFound)?
            .clone();

        Ok(MockTransport::new(d))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn mock_version() {
        let d = Arc::new(MockDevice::new("test"));
        let t = MockTransport::new(d.clone());

        let a = t
            .exchange(&APDUCommand {
                cla: CLA_CONSUMER,
                ins: Instruction::GetVersion as u8,
                p1: 0,
                p2: 0,
                data: vec![],
            })
            .await
            .unwrap();

        assert_eq!(a.retcode(), SW_OK);
        assert_eq!(a.data(), &MOCK_VERSION);

        assert_eq!(d.commands(), vec![vec![0x05, 0x00, 0x00, 0x00, 0x00]]);
    }

    #[tokio::test]
    async fn mock_close() {
        let d = Arc::new(MockDevice::new("test"));

        let t = MockTransport::new(d.clone());
        assert_eq!(d.open(), 1);

        drop(t);
        assert_eq!(d.open(), 0);
        assert_eq!(d.closed(), 1);
    }

    #[tokio::test]
    async fn mock_truncate() {
        let d = Arc::new(MockDevice::new("test").truncate_responses());
        let t = MockTransport::new(d.clone());

        let a = t
            .exchange(&APDUCommand {
                cla: CLA_CONSUMER,
                ins: Instruction::GetVersion as u8,
                p1: 0,
                p2: 0,
                data: vec![],
            })
            .await
            .unwrap();

        assert_eq!(a.retcode(), SW_OK);
        assert_eq!(a.data(), &MOCK_VERSION[..VERSION_RESP_LEN - 1]);
    }

    #[test]
    fn mock_seed_keys() {
        let d = MockDevice::with_seed("test", [7u8; 32]);
        let p0 = DerivationPath::new([44, 474, 0, 0, 0]);
        let p1 = DerivationPath::new([44, 474, 0, 0, 1]);

        let (pk0, a0) = d.address(&p0).unwrap();
        let (pk1, _) = d.address(&p1).unwrap();

        assert_ne!(pk0, pk1);
        assert_eq!(Bech32Codec::default().decode(&a0).unwrap(), pk0.to_vec());
    }
}
