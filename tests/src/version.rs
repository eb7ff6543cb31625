// Copyright (c) 2023 Oasis Protocol Foundation

//! Application version tests

use log::info;

use ledger_oasis::{AppSession, Exchange};
use ledger_oasis_apdu::version::{AppMode, VersionInfo, MIN_REQUIRED_VERSION};

/// Fetch the application version and check it meets the minimum required
pub async fn test<T>(t: T) -> anyhow::Result<VersionInfo>
where
    T: Exchange + Send + Sync,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    let mut s = AppSession::new(t, AppMode::Unknown);

    let v = s.get_version().await?;

    info!("app version: {} (mode: {})", v, v.mode);

    // Stored version follows the latest response
    assert_eq!(s.version(), &v);
    assert_eq!(s.mode(), v.mode);

    s.check_version(MIN_REQUIRED_VERSION).await?;

    s.close();

    Ok(v)
}
