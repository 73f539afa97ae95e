//! SHA-256 helpers shared by the presign path and the upload client.

use base64::prelude::*;
use sha2::{Digest, Sha256};

/// Header S3-compatible backends use to verify the uploaded body.
pub const CHECKSUM_HEADER: &str = "x-amz-checksum-sha256";

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Convert a hex digest into the base64 form carried by [`CHECKSUM_HEADER`].
pub fn hex_to_header_value(checksum_hex: &str) -> Result<String, hex::FromHexError> {
    let raw = hex::decode(checksum_hex)?;
    if raw.len() != 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(BASE64_STANDARD.encode(raw))
}
