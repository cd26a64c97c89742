//! Binary layout shared by the embedding matrix and the flat index:
//! 8-byte magic, two u64 LE header fields, then row-major f32 LE values.

use std::path::Path;

use ecfr_core::{Error, Result};

pub const EMBEDDINGS_MAGIC: &[u8; 8] = b"ECFREMB1";
pub const INDEX_MAGIC: &[u8; 8] = b"ECFRIDX1";

const HEADER_LEN: usize = 8 + 8 + 8;

pub(crate) fn encode(magic: &[u8; 8], a: usize, b: usize, values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + values.len() * 4);
    out.extend_from_slice(magic);
    out.extend_from_slice(&(a as u64).to_le_bytes());
    out.extend_from_slice(&(b as u64).to_le_bytes());
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Returns the two header fields and the payload; `payload.len() == a * b`.
pub(crate) fn decode(magic: &[u8; 8], bytes: &[u8], path: &Path) -> Result<(usize, usize, Vec<f32>)> {
    let bad = |reason: String| Error::Artifact { path: path.to_path_buf(), reason };
    if bytes.len() < HEADER_LEN {
        return Err(bad(format!("file too short ({} bytes)", bytes.len())));
    }
    if &bytes[..8] != magic {
        return Err(bad(format!("bad magic, expected {}", String::from_utf8_lossy(magic))));
    }
    let a = read_u64(&bytes[8..16]);
    let b = read_u64(&bytes[16..24]);
    let count = usize::try_from(a)
        .ok()
        .zip(usize::try_from(b).ok())
        .and_then(|(a, b)| a.checked_mul(b))
        .ok_or_else(|| bad(format!("header {} x {} overflows", a, b)))?;
    let payload = &bytes[HEADER_LEN..];
    if Some(payload.len()) != count.checked_mul(4) {
        return Err(bad(format!(
            "payload is {} bytes, header declares {} x {} f32 values",
            payload.len(),
            a,
            b
        )));
    }
    let values = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok((a as usize, b as usize, values))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// Embedding matrix `(rows, dim)`.
pub fn encode_embeddings(rows: &[Vec<f32>], dim: usize) -> Vec<u8> {
    let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    encode(EMBEDDINGS_MAGIC, rows.len(), dim, &flat)
}

pub fn decode_embeddings(bytes: &[u8], path: &Path) -> Result<Vec<Vec<f32>>> {
    let (rows, dim, flat) = decode(EMBEDDINGS_MAGIC, bytes, path)?;
    if dim == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(flat.chunks_exact(dim).map(<[f32]>::to_vec).collect())
}
