//! Length-prefixed, checksum-framed encoding shared by WAL entries and shard
//! records (resolves the encoding Open Question in SPEC_FULL.md §4: compact
//! binary over line-oriented text).
//!
//! Frame layout: `[u32 LE length][msgpack payload][u32 LE crc32(payload)]`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use docvault_core::Error;
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Cursor, Read};

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let payload = rmp_serde::to_vec(value).map_err(|e| Error::Corrupt(e.to_string()))?;
    let crc = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(4 + payload.len() + 4);
    out.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
    out.extend_from_slice(&payload);
    out.write_u32::<LittleEndian>(crc).unwrap();
    Ok(out)
}

/// Reads exactly one frame from `reader`. Returns `Ok(None)` at a clean EOF
/// (no bytes at all read for the length prefix); a partial frame or checksum
/// mismatch is `Err(Corrupt)`, letting the caller stop replay at the torn
/// tail per spec §4.2's crash-safety contract.
pub fn decode_one<T: DeserializeOwned, R: Read>(reader: &mut R) -> Result<Option<T>, Error> {
    let len = match reader.read_u32::<LittleEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::from(e)),
    };
    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|_| Error::Corrupt("truncated WAL frame payload".into()))?;
    let expected_crc = reader
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::Corrupt("truncated WAL frame checksum".into()))?;
    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        return Err(Error::Corrupt(format!(
            "WAL frame checksum mismatch: expected {expected_crc}, got {actual_crc}"
        )));
    }
    let value = rmp_serde::from_slice(&payload).map_err(|e| Error::Corrupt(e.to_string()))?;
    Ok(Some(value))
}

/// Decodes every well-formed frame from a byte buffer, stopping silently at
/// the first torn or corrupt frame rather than failing the whole replay —
/// the torn tail is exactly what an interrupted `append` leaves behind.
/// Returns the decoded values and whether a torn/corrupt tail was hit.
pub fn decode_all_best_effort<T: DeserializeOwned>(bytes: &[u8]) -> (Vec<T>, bool) {
    let mut cursor = Cursor::new(bytes);
    let mut out = Vec::new();
    loop {
        match decode_one::<T, _>(&mut cursor) {
            Ok(Some(v)) => out.push(v),
            Ok(None) => return (out, false),
            Err(_) => return (out, true),
        }
    }
}
