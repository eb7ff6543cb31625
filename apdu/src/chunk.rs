// Copyright (c) 2023 Oasis Protocol Foundation

//! Chunking for signing requests
//!
//! Signing payloads exceed the maximum APDU size and are streamed to the device
//! as a sequence of chunks. The first chunk carries only the encoded derivation
//! path, following chunks carry the body:
//!
//! ```text
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  CONTEXT_LEN  |         CONTEXT...          |   MESSAGE...    /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! split into `chunk_size` slices, the final slice tagged [ChunkKind::Last].

use num_enum::TryFromPrimitive;
use strum::Display;

use crate::{ApduError, MAX_CONTEXT_LEN};

/// Chunk position, sent as `P1` of each signing APDU
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum ChunkKind {
    /// First chunk, containing the derivation path
    Init = 0x00,
    /// Intermediate body chunk
    Add = 0x01,
    /// Final body chunk, the response contains the signature
    Last = 0x02,
}

/// Single chunk of a signing request
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub data: Vec<u8>,
}

/// Split a signing request into an ordered list of chunks
///
/// Returns `1 + ceil(body_len / chunk_size)` chunks, where the body is the
/// length-prefixed context followed by the message.
pub fn prepare_chunks(
    path: &[u8],
    context: &[u8],
    message: &[u8],
    chunk_size: usize,
) -> Result<Vec<Chunk>, ApduError> {
    if context.len() > MAX_CONTEXT_LEN {
        return Err(ApduError::ContextTooLarge(context.len()));
    }
    if chunk_size == 0 {
        return Err(ApduError::InvalidChunkSize);
    }

    let mut body = Vec::with_capacity(1 + context.len() + message.len());
    body.push(context.len() as u8);
    body.extend_from_slice(context);
    body.extend_from_slice(message);

    // Body is never empty so this always yields at least one slice
    let n = body.len().div_ceil(chunk_size);

    let mut chunks = Vec::with_capacity(1 + n);
    chunks.push(Chunk {
        kind: ChunkKind::Init,
        data: path.to_vec(),
    });

    for (i, d) in body.chunks(chunk_size).enumerate() {
        let kind = match i + 1 == n {
            true => ChunkKind::Last,
            false => ChunkKind::Add,
        };

        chunks.push(Chunk {
            kind,
            data: d.to_vec(),
        });
    }

    Ok(chunks)
}
