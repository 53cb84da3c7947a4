use crate::error::Error;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of entropy bytes generated for a new wallet (12-word mnemonic)
pub const ENTROPY_BYTES: usize = 16;

/// Something that can hand out fresh entropy for the first derivation step.
pub trait EntropySource {
    fn generate(&mut self) -> Result<[u8; ENTROPY_BYTES], Error>;
}

/// Entropy from the operating system's CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn generate(&mut self) -> Result<[u8; ENTROPY_BYTES], Error> {
        let mut bytes = [0u8; ENTROPY_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::EntropyUnavailable(e.to_string()))?;
        Ok(bytes)
    }
}

/// Replays a caller-supplied entropy value, for reproducible walkthroughs.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub [u8; ENTROPY_BYTES]);

impl FixedEntropy {
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| Error::InvalidEntropy(e.to_string()))?;
        let bytes: [u8; ENTROPY_BYTES] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidEntropy(format!(
                "expected {} bytes, got {}",
                ENTROPY_BYTES,
                v.len()
            ))
        })?;
        Ok(FixedEntropy(bytes))
    }
}

impl EntropySource for FixedEntropy {
    fn generate(&mut self) -> Result<[u8; ENTROPY_BYTES], Error> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_entropy_differs_between_calls() {
        let mut source = OsEntropy;
        let a = source.generate().unwrap();
        let b = source.generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fixed_entropy_from_hex() {
        let fixed = FixedEntropy::from_hex("0x000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(fixed.0[15], 0x0f);

        assert!(matches!(
            FixedEntropy::from_hex("0001"),
            Err(Error::InvalidEntropy(_))
        ));
        assert!(FixedEntropy::from_hex("zz").is_err());
    }
}
