//! Fixed-width numeric segments
//!
//! All numeric key segments are big-endian so that byte order matches
//! numeric order for unsigned values. Signed values that may be negative
//! (sorted-set scores) go through the sortable encoding instead.

use crate::error::{CollectionError, Result};

const SIGN_BIT: u64 = 1 << 63;

/// Encode an i64 so that unsigned byte order matches signed numeric order
///
/// Flipping the sign bit maps `i64::MIN..=i64::MAX` onto `0..=u64::MAX`
/// monotonically; the result is then written big-endian.
pub fn encode_sortable_i64(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_BIT).to_be_bytes()
}

/// Inverse of [`encode_sortable_i64`]
pub fn decode_sortable_i64(bytes: &[u8]) -> Result<i64> {
    Ok((u64::from_be_bytes(fixed::<8>(bytes)?) ^ SIGN_BIT) as i64)
}

pub fn decode_u16(bytes: &[u8]) -> Result<u16> {
    Ok(u16::from_be_bytes(fixed::<2>(bytes)?))
}

pub fn decode_u32(bytes: &[u8]) -> Result<u32> {
    Ok(u32::from_be_bytes(fixed::<4>(bytes)?))
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    Ok(u64::from_be_bytes(fixed::<8>(bytes)?))
}

/// Plain two's complement big-endian (generation versions are never negative)
pub fn decode_i64(bytes: &[u8]) -> Result<i64> {
    Ok(i64::from_be_bytes(fixed::<8>(bytes)?))
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        CollectionError::MalformedKey(format!(
            "expected {}-byte numeric segment, got {} bytes",
            N,
            bytes.len()
        ))
    })
}
