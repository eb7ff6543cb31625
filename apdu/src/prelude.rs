// Copyright (c) 2023 Oasis Protocol Foundation

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    chunk::{prepare_chunks, Chunk, ChunkKind},
    command::{AddressResp, Command, Status},
    path::{encode_path, DerivationPath, HARDENED, PATH_LEN},
    version::{check_version, AppMode, VersionInfo, VersionRequired, MIN_REQUIRED_VERSION},
    ApduError, Instruction,
};
