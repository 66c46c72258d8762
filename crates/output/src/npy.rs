//! One-dimensional float64 arrays in NumPy's `.npy` format (version 1.0).
//!
//! ```text
//! \x93NUMPY  major=1 minor=0  header_len: u16 LE
//! {'descr': '<f8', 'fortran_order': False, 'shape': (N,), }   (space padded, '\n')
//! N little-endian f64 values
//! ```
//!
//! The preamble plus header is padded to a multiple of 64 bytes.

use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic, two version bytes and the header length field.
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;

const ALIGNMENT: usize = 64;

/// Errors from reading or writing `.npy` data.
#[derive(Debug, Error)]
pub enum NpyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a .npy file")]
    BadMagic,

    #[error("Unsupported .npy version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("Malformed .npy header: {0}")]
    BadHeader(String),

    #[error("Data section has {found} bytes, expected {expected}")]
    Truncated { expected: usize, found: usize },

    #[error("Header too long: {0} bytes")]
    HeaderTooLong(usize),
}

fn header_dict(len: usize) -> String {
    format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({},), }}",
        len
    )
}

/// Serialize `values` as a `.npy` byte buffer.
pub fn encode(values: &[f64]) -> Result<Vec<u8>, NpyError> {
    let mut header = header_dict(values.len());
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len =
        u16::try_from(header.len()).map_err(|_| NpyError::HeaderTooLong(header.len()))?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + header.len() + values.len() * 8);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

/// Parse a `.npy` buffer holding a one-dimensional `<f8` array.
pub fn decode(bytes: &[u8]) -> Result<Vec<f64>, NpyError> {
    if bytes.len() < PREAMBLE_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let (major, minor) = (bytes[6], bytes[7]);
    if major != 1 {
        return Err(NpyError::UnsupportedVersion { major, minor });
    }

    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = PREAMBLE_LEN + header_len;
    let header = bytes
        .get(PREAMBLE_LEN..data_start)
        .ok_or_else(|| NpyError::BadHeader("header runs past end of data".to_string()))?;
    let header = std::str::from_utf8(header)
        .map_err(|_| NpyError::BadHeader("header is not ASCII".to_string()))?;

    if !header.contains("'descr': '<f8'") {
        return Err(NpyError::BadHeader(format!(
            "unsupported dtype in {}",
            header.trim()
        )));
    }
    if !header.contains("'fortran_order': False") {
        return Err(NpyError::BadHeader("fortran order".to_string()));
    }
    let len = parse_shape(header)?;

    let data = &bytes[data_start..];
    if data.len() != len * 8 {
        return Err(NpyError::Truncated {
            expected: len * 8,
            found: data.len(),
        });
    }

    Ok(data
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Length of a one-dimensional `'shape': (N,)` entry.
fn parse_shape(header: &str) -> Result<usize, NpyError> {
    let bad = || NpyError::BadHeader(format!("bad shape in {}", header.trim()));

    let start = header.find("'shape': (").ok_or_else(bad)? + "'shape': (".len();
    let rest = &header[start..];
    let end = rest.find(')').ok_or_else(bad)?;
    let dims: Vec<&str> = rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();

    match dims.as_slice() {
        [n] => n.parse().map_err(|_| bad()),
        _ => Err(bad()),
    }
}

/// Write `values` to `path`.
pub fn write_npy(path: &Path, values: &[f64]) -> Result<(), NpyError> {
    let bytes = encode(values)?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Read a one-dimensional float64 array from `path`.
pub fn read_npy(path: &Path) -> Result<Vec<f64>, NpyError> {
    decode(&fs::read(path)?)
}
