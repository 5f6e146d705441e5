//! # Mutex Identifiers
//!
//! 128-bit ids drawn from the OS CSPRNG, printed UUID-shaped (4-2-2-2-6 hex
//! groups separated by hyphens) but never claiming to be a UUID: there's no
//! version/variant bit-twiddling here, just 16 random bytes and a grouping
//! convention readers already recognize.

use netmutex_common::NetMutexError;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes per mutex id.
pub const MUTEX_ID_SIZE: usize = 16;

const GROUP_LENS: [usize; 5] = [4, 2, 2, 2, 6];

/// Generates a fresh 128-bit id from the OS CSPRNG, hex-encoded and grouped.
pub fn new_id() -> Result<String, NetMutexError> {
    let mut buf = [0u8; MUTEX_ID_SIZE];
    OsRng.try_fill_bytes(&mut buf).map_err(|_| NetMutexError::RngFailure)?;
    Ok(encode_hex(&buf))
}

/// Hex-encodes `bytes` and inserts hyphens at the 4-2-2-2-6 group boundaries.
/// Only meaningful for exactly [`MUTEX_ID_SIZE`] bytes; shorter/longer input
/// is still encoded, just without hyphens landing where you'd expect.
pub fn encode_hex(bytes: &[u8]) -> String {
    let hex = to_hex(bytes);
    if bytes.len() != MUTEX_ID_SIZE {
        return hex;
    }
    let mut out = String::with_capacity(hex.len() + GROUP_LENS.len() - 1);
    let mut pos = 0;
    for (i, group_hex_len) in GROUP_LENS.iter().map(|b| b * 2).enumerate() {
        if i > 0 {
            out.push('-');
        }
        out.push_str(&hex[pos..pos + group_hex_len]);
        pos += group_hex_len;
    }
    out
}

/// Plain hex encoding, no grouping.
pub fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decodes a hex string, tolerating (and stripping) hyphen group separators.
/// Rejects anything that doesn't decode to exactly [`MUTEX_ID_SIZE`] bytes.
pub fn from_hex(s: &str) -> Option<[u8; MUTEX_ID_SIZE]> {
    let stripped: String = s.chars().filter(|c| *c != '-').collect();
    if stripped.len() != MUTEX_ID_SIZE * 2 {
        return None;
    }
    let mut out = [0u8; MUTEX_ID_SIZE];
    let chars: Vec<char> = stripped.chars().collect();
    for i in 0..MUTEX_ID_SIZE {
        let hi = hex_digit(chars[i * 2])?;
        let lo = hex_digit(chars[i * 2 + 1])?;
        out[i] = (hi << 4) | lo;
    }
    Some(out)
}

/// Decodes a single hex character. Shared with `registry::shard_index`,
/// which only needs the first two digits of an id.
pub(crate) fn hex_digit(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='f' => Some(c as u8 - b'a' + 10),
        'A'..='F' => Some(c as u8 - b'A' + 10),
        _ => None,
    }
}
