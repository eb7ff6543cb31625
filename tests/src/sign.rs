// Copyright (c) 2023 Oasis Protocol Foundation

//! Signing tests

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, info};
use sha2::{Digest, Sha512_256};

use ledger_oasis::{AppSession, Exchange};
use ledger_oasis_apdu::{path::DerivationPath, version::AppMode};

/// Signing request for tests
#[derive(Clone, PartialEq, Debug)]
pub struct SignRequest<'a> {
    pub path: DerivationPath,
    pub context: &'a [u8],
    pub message: &'a [u8],
}

/// Sign a message and verify the signature against the device public key
pub async fn test<T>(t: T, req: &SignRequest<'_>) -> anyhow::Result<Signature>
where
    T: Exchange + Send + Sync,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    let mut s = AppSession::new(t, AppMode::for_path(&req.path));

    let pk = s.get_public_key(&req.path).await?;
    let pk = VerifyingKey::from_bytes(&pk)?;

    info!(
        "signing {} byte message with key: {}",
        req.message.len(),
        hex::encode(pk.as_bytes())
    );

    let sig = s.sign(&req.path, req.context, req.message).await?;

    debug!("signature: {}", hex::encode(&sig));

    let sig = Signature::from_slice(&sig)?;

    // Oasis signatures are over the SHA-512/256 of context and message
    let mut h = Sha512_256::new();
    h.update(req.context);
    h.update(req.message);

    pk.verify(&h.finalize(), &sig)?;

    s.close();

    Ok(sig)
}
