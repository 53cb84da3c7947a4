use crate::error::Error;
use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use tiny_keccak::{Hasher, Keccak};

pub type HmacSha512 = Hmac<Sha512>;

/// Compute HMAC-SHA512
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut hash = [0u8; 64];
    hash.copy_from_slice(&result[..]);
    hash
}

/// Compute SHA256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA256 hash
pub fn hash_twice(data: &[u8]) -> [u8; 32] {
    let first = sha256(data);
    sha256(&first)
}

/// RIPEMD160(SHA256(data)), the 20-byte hash behind P2PKH and P2WPKH
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

/// Keccak-256 as used by Ethereum (not NIST SHA3-256)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    keccak.update(data);
    let mut hash = [0u8; 32];
    keccak.finalize(&mut hash);
    hash
}

/// Calculate checksum (first 4 bytes of double-SHA256 hash)
pub fn checksum(data: &[u8]) -> [u8; 4] {
    let hash = hash_twice(data);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&hash[0..4]);
    checksum
}

/// Encode a base58 string with a checksum
pub fn base58check_encode(data: &[u8]) -> String {
    let mut check_data = Vec::with_capacity(data.len() + 4);
    check_data.extend_from_slice(data);
    check_data.extend_from_slice(&checksum(data));
    bs58::encode(check_data).into_string()
}

/// Decode a base58 string and verify its checksum
pub fn base58check_decode(data: &str) -> Result<Vec<u8>, Error> {
    let decoded = bs58::decode(data)
        .into_vec()
        .map_err(|_| Error::Base58DecodeError("Invalid base58 string".to_string()))?;

    if decoded.len() < 4 {
        return Err(Error::InvalidChecksum);
    }

    let (data_part, checksum_part) = decoded.split_at(decoded.len() - 4);
    if checksum_part != &checksum(data_part)[..] {
        return Err(Error::InvalidChecksum);
    }

    Ok(data_part.to_vec())
}

/// Lowercase hex with a `0x` prefix
pub fn hex_prefixed(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Render bytes as a string of '0'/'1', most significant bit first
pub fn to_binary_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:08b}", b)).collect()
}
