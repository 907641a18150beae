//! On-disk layout
//!
//! ```text
//! "DDTC" | format version (u32 LE)
//! header record: length (u32 LE) | JSON header | CRC32 of length + JSON (u32 LE)
//! data blocks, one per variable, little-endian, at offsets relative to the
//! end of the header record
//! ```
//!
//! Block encodings: `i32`/`f64` elements as little-endian words, `c128` as
//! two `f64` (re, im), `str` as length-prefixed (u32 LE) UTF-8.
//!
//! Fixed-width blocks also carry one CRC32 per [`CHUNK_BYTES`] bytes, so a
//! sub-block can be read and verified without touching the rest.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

use chrono::{DateTime, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::checksum::compute_checksum;
use super::variable::{DType, VariableData, VariableHeader};
use crate::schema::DdVersion;

pub const MAGIC: &[u8; 4] = b"DDTC";
pub const FORMAT_VERSION: u32 = 1;
/// Magic plus format version
pub(crate) const PREAMBLE_LEN: u64 = 8;
/// Length prefix plus checksum
const MIN_RECORD_SIZE: usize = 4 + 4;
/// Granularity of the per-chunk checksums of fixed-width blocks
pub(crate) const CHUNK_BYTES: u64 = 4096;

/// Location and checksums of one data block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BlockRef {
    pub offset: u64,
    pub length: u64,
    pub checksum: u32,
    /// CRC32 of each `CHUNK_BYTES` slice; empty for string blocks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<u32>,
}

impl BlockRef {
    pub fn new(offset: u64, dtype: DType, block: &[u8]) -> Self {
        let chunks = match dtype.width() {
            Some(_) => block
                .chunks(CHUNK_BYTES as usize)
                .map(compute_checksum)
                .collect(),
            None => Vec::new(),
        };
        Self {
            offset,
            length: block.len() as u64,
            checksum: compute_checksum(block),
            chunks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredVariable {
    pub header: VariableHeader,
    pub block: BlockRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileHeader {
    pub dataset: String,
    pub dd_version: DdVersion,
    pub created: DateTime<Utc>,
    pub dimensions: BTreeMap<String, usize>,
    pub variables: Vec<StoredVariable>,
}

pub(crate) fn encode_preamble() -> [u8; PREAMBLE_LEN as usize] {
    let mut preamble = [0u8; PREAMBLE_LEN as usize];
    preamble[..4].copy_from_slice(MAGIC);
    preamble[4..].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    preamble
}

/// Serializes the header record
pub(crate) fn encode_header(header: &FileHeader) -> io::Result<Vec<u8>> {
    let body = serde_json::to_vec(header)?;
    let record_length = (MIN_RECORD_SIZE + body.len()) as u32;

    let mut record = Vec::with_capacity(record_length as usize);
    record.extend_from_slice(&record_length.to_le_bytes());
    record.extend_from_slice(&body);
    let checksum = compute_checksum(&record);
    record.extend_from_slice(&checksum.to_le_bytes());
    Ok(record)
}

/// Parses a header record, verifying its checksum.
///
/// Returns the header and the number of bytes consumed.
pub(crate) fn decode_header(data: &[u8]) -> io::Result<(FileHeader, usize)> {
    if data.len() < MIN_RECORD_SIZE {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Header record too short"));
    }

    let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if record_length < MIN_RECORD_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid header length: {}", record_length),
        ));
    }
    if data.len() < record_length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "Header truncated: expected {} bytes, got {}",
                record_length,
                data.len()
            ),
        ));
    }

    let checksum_offset = record_length - 4;
    let stored = u32::from_le_bytes([
        data[checksum_offset],
        data[checksum_offset + 1],
        data[checksum_offset + 2],
        data[checksum_offset + 3],
    ]);
    let computed = compute_checksum(&data[..checksum_offset]);
    if computed != stored {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            ),
        ));
    }

    let header = serde_json::from_slice(&data[4..checksum_offset])?;
    Ok((header, record_length))
}

/// Serializes one variable's elements
pub(crate) fn encode_block(data: &VariableData) -> Vec<u8> {
    let mut buf = Vec::new();
    match data {
        VariableData::Str(values) => {
            for s in values {
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
        }
        VariableData::Int(values) => {
            buf.reserve(values.len() * 4);
            for v in values {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        VariableData::Float(values) => {
            buf.reserve(values.len() * 8);
            for v in values {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        VariableData::Complex(values) => {
            buf.reserve(values.len() * 16);
            for v in values {
                buf.extend_from_slice(&v.re.to_le_bytes());
                buf.extend_from_slice(&v.im.to_le_bytes());
            }
        }
    }
    buf
}

/// Parses `count` elements of `dtype`; trailing bytes are an error
pub(crate) fn decode_block(dtype: DType, count: usize, data: &[u8]) -> io::Result<VariableData> {
    // each string carries at least its length prefix
    let needed = count.checked_mul(dtype.width().unwrap_or(4));
    let fits = match dtype.width() {
        Some(_) => needed == Some(data.len()),
        None => needed.is_some_and(|n| n <= data.len()),
    };
    if !fits {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} bytes cannot hold {} {} elements", data.len(), count, dtype.as_str()),
        ));
    }

    let mut cursor = Cursor::new(data);
    let decoded = match dtype {
        DType::Str => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let len = read_u32(&mut cursor)? as usize;
                let mut bytes = vec![0u8; len];
                cursor.read_exact(&mut bytes)?;
                let s = String::from_utf8(bytes).map_err(|e| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {}", e))
                })?;
                values.push(s);
            }
            VariableData::Str(values)
        }
        DType::I32 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let mut word = [0u8; 4];
                cursor.read_exact(&mut word)?;
                values.push(i32::from_le_bytes(word));
            }
            VariableData::Int(values)
        }
        DType::F64 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                values.push(read_f64(&mut cursor)?);
            }
            VariableData::Float(values)
        }
        DType::C128 => {
            let mut values = Vec::with_capacity(count);
            for _ in 0..count {
                let re = read_f64(&mut cursor)?;
                let im = read_f64(&mut cursor)?;
                values.push(Complex64::new(re, im));
            }
            VariableData::Complex(values)
        }
    };

    if cursor.position() != data.len() as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "{} trailing bytes after {} elements",
                data.len() as u64 - cursor.position(),
                count
            ),
        ));
    }
    Ok(decoded)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    Ok(u32::from_le_bytes(word))
}

fn read_f64<R: Read>(reader: &mut R) -> io::Result<f64> {
    let mut word = [0u8; 8];
    reader.read_exact(&mut word)?;
    Ok(f64::from_le_bytes(word))
}
