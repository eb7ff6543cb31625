// Copyright (c) 2023 Oasis Protocol Foundation

//! Command line utility for interacting with the Ledger Oasis app

use clap::Parser;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::{debug, info, LevelFilter};

use ledger_oasis::{
    apdu::{path::DerivationPath, version::MIN_REQUIRED_VERSION, LISTING_PATH},
    prepare_context,
    transport::LedgerProvider,
    AppSession, DeviceLocator, Exchange, RootPaths, Selector, SignerRole, WalletId,
};

mod helpers;
use helpers::*;

/// Ledger command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Select device by wallet ID
    #[clap(long, conflicts_with = "address")]
    wallet_id: Option<WalletId>,

    /// Select device by the address at the listing path
    #[clap(long)]
    address: Option<String>,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Fetch application version
    Version,

    /// Fetch public key and address
    Address {
        /// Signer role for root path selection
        #[clap(long, value_enum, default_value = "entity")]
        role: SignerRole,

        /// Account index
        #[clap(long, default_value = "0")]
        index: u32,

        /// Display address on device for confirmation
        #[clap(long)]
        show: bool,
    },

    /// Sign a message and verify the returned signature
    Sign {
        /// Signer role for root path selection
        #[clap(long, value_enum, default_value = "entity")]
        role: SignerRole,

        /// Account index
        #[clap(long, default_value = "0")]
        index: u32,

        /// Signing context
        #[clap(long)]
        context: String,

        /// Hex encoded message
        #[clap(long)]
        message: HexData,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Setup device locator
    let p = LedgerProvider::new()?;
    let l = DeviceLocator::new(p);

    // Handle list command
    if args.cmd == Actions::List {
        return list(&l).await;
    }

    let selector = match (args.wallet_id, args.address) {
        (Some(w), _) => Selector::WalletId(w),
        (_, Some(a)) => Selector::Address(a),
        _ => Selector::Any,
    };

    debug!("Using selector: {}", selector);

    // Resolve the key path for the command, this selects the app mode
    let path = match &args.cmd {
        Actions::Address { role, index, .. } | Actions::Sign { role, index, .. } => {
            RootPaths::default()
                .path(*role, *index)
                .ok_or_else(|| anyhow::anyhow!("No root path for role {}", role))?
        }
        _ => DerivationPath::from(LISTING_PATH),
    };

    // Version requests without a selector use the first compatible device
    let s = match (&args.cmd, &selector) {
        (Actions::Version, Selector::Any) => l.find_first_compatible().await?,
        _ => l.find_by_selector(&selector, &path).await?,
    };

    // Execute command
    execute(s, &path, args.cmd).await?;

    Ok(())
}

/// Execute a command with the provided session
async fn execute<T>(mut s: AppSession<T>, path: &DerivationPath, cmd: Actions) -> anyhow::Result<()>
where
    T: Exchange + Sync + Send,
    T::Error: std::error::Error + Sync + Send + 'static,
{
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Version => {
            let v = s.check_version(MIN_REQUIRED_VERSION).await?;

            info!("app version: {} (mode: {})", v, v.mode);
        }
        Actions::Address { role, show, .. } => {
            info!("requesting address for {} key (path: {})", role, path);

            let a = match show {
                true => s.show_address(path).await?,
                false => s.get_address(path, false).await?,
            };

            info!("public key: {}", hex::encode(a.public_key));
            info!("wallet ID:  {}", WalletId::from_public_key(&a.public_key));
            info!("address:    {}", a.address);
        }
        Actions::Sign {
            context, message, ..
        } => {
            let context = prepare_context(context.as_bytes())?;

            info!("signing message: {} (path: {})", message, path);

            let pk = s.get_public_key(path).await?;
            let sig = s.sign(path, context, message.as_ref()).await?;

            info!("public key: {}", hex::encode(pk));
            info!("signature:  {}", hex::encode(&sig));

            // Verify signature locally
            let pk = VerifyingKey::from_bytes(&pk)?;
            let sig = Signature::from_slice(&sig)?;

            match pk.verify(&signed_message(context, message.as_ref()), &sig) {
                Ok(_) => info!("signature verified"),
                Err(e) => return Err(anyhow::anyhow!("signature verification failed: {}", e)),
            }
        }
        Actions::List => {
            return Err(anyhow::anyhow!("list does not use a device session"));
        }
    }

    s.close();

    Ok(())
}

/// List connected devices with their listing address and wallet ID
async fn list(l: &DeviceLocator<LedgerProvider>) -> anyhow::Result<()> {
    let path = DerivationPath::from(LISTING_PATH);
    let apps = l.list_apps(&path).await;

    if apps.is_empty() {
        return Err(anyhow::anyhow!("No devices found"));
    }

    info!("Devices:");
    for a in apps {
        info!("- Wallet ID: {} ({})", a.wallet_id, a.device);
        info!("  App version: {}", a.version);
        info!("  Address: {}", a.address);
    }

    Ok(())
}

/// Oasis signers sign the SHA-512/256 digest of the context and message
fn signed_message(context: &[u8], message: &[u8]) -> Vec<u8> {
    use sha2::{Digest, Sha512_256};

    let mut h = Sha512_256::new();
    h.update(context);
    h.update(message);

    h.finalize().to_vec()
}
