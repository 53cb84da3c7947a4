use crate::error::Error;
use crate::utils;
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use std::fmt;
use std::str::FromStr;

/// Length of a serialized extended key before Base58Check
const EXTENDED_KEY_LEN: usize = 78;

/// The network type for HD keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
}

impl Network {
    /// Get the version bytes for extended private keys
    pub fn xprv_version(&self) -> [u8; 4] {
        match self {
            Network::Bitcoin => [0x04, 0x88, 0xAD, 0xE4], // xprv
            Network::Testnet => [0x04, 0x35, 0x83, 0x94], // tprv
        }
    }

    /// Get the version bytes for extended public keys
    pub fn xpub_version(&self) -> [u8; 4] {
        match self {
            Network::Bitcoin => [0x04, 0x88, 0xB2, 0x1E], // xpub
            Network::Testnet => [0x04, 0x35, 0x87, 0xCF], // tpub
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Ok(Network::Bitcoin),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(Error::UnsupportedParameter(format!("unknown network '{}'", other))),
        }
    }
}

/// A path element in a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildNumber {
    /// Normal derivation index (0..2^31-1)
    Normal(u32),
    /// Hardened derivation index (2^31..2^32-1)
    Hardened(u32),
}

impl ChildNumber {
    /// Maximum normal index
    pub const MAX_NORMAL_INDEX: u32 = 0x7fffffff;

    /// Build a child number from a 0-based index and a hardened flag
    pub fn new(index: u32, hardened: bool) -> Result<Self, Error> {
        if index > ChildNumber::MAX_NORMAL_INDEX {
            return Err(Error::InvalidDerivationPath(format!(
                "index {} out of range",
                index
            )));
        }
        Ok(if hardened {
            ChildNumber::Hardened(index)
        } else {
            ChildNumber::Normal(index)
        })
    }

    /// Convert to raw index value
    pub fn to_u32(&self) -> u32 {
        match self {
            ChildNumber::Normal(i) => *i,
            ChildNumber::Hardened(i) => i | (ChildNumber::MAX_NORMAL_INDEX + 1),
        }
    }

    /// The 0-based index without the hardened offset
    pub fn index(&self) -> u32 {
        match self {
            ChildNumber::Normal(i) | ChildNumber::Hardened(i) => *i,
        }
    }

    /// Check if the child number is hardened
    pub fn is_hardened(&self) -> bool {
        matches!(self, ChildNumber::Hardened(_))
    }
}

impl From<u32> for ChildNumber {
    fn from(raw: u32) -> Self {
        if raw > ChildNumber::MAX_NORMAL_INDEX {
            ChildNumber::Hardened(raw & ChildNumber::MAX_NORMAL_INDEX)
        } else {
            ChildNumber::Normal(raw)
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let marker = if self.is_hardened() { "'" } else { "" };
        write!(f, "{}{}", self.index(), marker)
    }
}

impl FromStr for ChildNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix('\'').or_else(|| s.strip_suffix('h')) {
            Some(digits) => (digits, true),
            None => (s, false),
        };

        let index: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidDerivationPath(format!("invalid index '{}'", s)))?;

        ChildNumber::new(index, hardened)
    }
}

/// A BIP-32 derivation path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivationPath {
    pub path: Vec<ChildNumber>,
}

impl DerivationPath {
    /// The empty path `m`
    pub fn master() -> Self {
        DerivationPath { path: vec![] }
    }

    /// This path followed by one more child
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut path = self.path.clone();
        path.push(child);
        DerivationPath { path }
    }

    /// This path followed by every segment of `other`
    pub fn extend(&self, other: &DerivationPath) -> Self {
        let mut path = self.path.clone();
        path.extend_from_slice(&other.path);
        DerivationPath { path }
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildNumber> {
        self.path.iter()
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(path: Vec<ChildNumber>) -> Self {
        DerivationPath { path }
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "m")?;
        for child in &self.path {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    /// Parse a path such as "m/44'/0'/0'/0/0"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = match s.strip_prefix('m') {
            Some(rest) => rest,
            None => {
                return Err(Error::InvalidDerivationPath(
                    "Path must start with 'm'".to_string(),
                ))
            }
        };

        if rest.is_empty() {
            return Ok(DerivationPath::master());
        }

        let rest = rest.strip_prefix('/').ok_or_else(|| {
            Error::InvalidDerivationPath("Invalid path format".to_string())
        })?;

        let path = rest
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<ChildNumber>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DerivationPath { path })
    }
}

/// One node of a BIP-32 tree. A node carrying a private key can derive both
/// hardened and normal children; a neutered node only normal ones.
///
/// Nodes are plain values: deriving a child never touches the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_number: u32,
    pub chain_code: [u8; 32],
    pub private_key: Option<SecretKey>,
    pub public_key: PublicKey,
    pub network: Network,
}

impl ExtendedKey {
    /// Create a new master extended key from a seed
    pub fn new_master(seed: &[u8], network: Network) -> Result<Self, Error> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(Error::InvalidSeed(format!(
                "Seed must be 16 to 64 bytes, got {}",
                seed.len()
            )));
        }

        let hmac_result = utils::hmac_sha512(b"Bitcoin seed", seed);

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&hmac_result[32..64]);

        let sk = SecretKey::from_slice(&hmac_result[0..32])
            .map_err(|_| Error::InvalidKey("Invalid master key from seed".to_string()))?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &sk);

        Ok(ExtendedKey {
            depth: 0,
            parent_fingerprint: [0, 0, 0, 0],
            child_number: 0,
            chain_code,
            private_key: Some(sk),
            public_key,
            network,
        })
    }

    /// Whether the private half has been stripped
    pub fn is_neutered(&self) -> bool {
        self.private_key.is_none()
    }

    /// Copy of this node without its private key
    pub fn neuter(&self) -> ExtendedKey {
        ExtendedKey {
            private_key: None,
            ..self.clone()
        }
    }

    /// First 4 bytes of HASH160 of the public key
    pub fn fingerprint(&self) -> [u8; 4] {
        let id = utils::hash160(&self.public_key.serialize());
        let mut fingerprint = [0u8; 4];
        fingerprint.copy_from_slice(&id[0..4]);
        fingerprint
    }

    /// Derive a child by 0-based index and hardened flag
    pub fn derive(&self, index: u32, hardened: bool) -> Result<ExtendedKey, Error> {
        self.derive_child(ChildNumber::new(index, hardened)?)
    }

    /// Derive a child key (CKDpriv, or CKDpub on a neutered node)
    pub fn derive_child(&self, child_number: ChildNumber) -> Result<ExtendedKey, Error> {
        let secp = Secp256k1::new();
        let mut hmac_input = Vec::with_capacity(37);

        if child_number.is_hardened() {
            // Hardened derivation: data = 0x00 || private_key || child_number
            let private_key = self
                .private_key
                .as_ref()
                .ok_or(Error::PublicDerivationUnavailable)?;
            hmac_input.push(0);
            hmac_input.extend_from_slice(&private_key.secret_bytes());
        } else {
            // Normal derivation: data = public_key || child_number
            hmac_input.extend_from_slice(&self.public_key.serialize());
        }

        let index = child_number.to_u32();
        hmac_input.extend_from_slice(&index.to_be_bytes());

        // I = HMAC-SHA512(chain_code, data)
        let hmac_result = utils::hmac_sha512(&self.chain_code, &hmac_input);

        let mut i_r = [0u8; 32];
        i_r.copy_from_slice(&hmac_result[32..64]);

        let tweak = SecretKey::from_slice(&hmac_result[0..32])
            .map_err(|_| Error::InvalidKey("Invalid HMAC-SHA512 left half".to_string()))?;

        let (private_key, public_key) = match &self.private_key {
            Some(parent) => {
                // child key = (I_L + parent_key) mod n
                let child = tweak
                    .add_tweak(&Scalar::from(*parent))
                    .map_err(|_| Error::InvalidKey("Invalid child private key".to_string()))?;
                (Some(child), PublicKey::from_secret_key(&secp, &child))
            }
            None => {
                // child point = point(I_L) + parent_point
                let point = PublicKey::from_secret_key(&secp, &tweak);
                let child = self
                    .public_key
                    .combine(&point)
                    .map_err(|_| Error::InvalidKey("Invalid child public key".to_string()))?;
                (None, child)
            }
        };

        let depth = self.depth.checked_add(1).ok_or_else(|| {
            Error::InvalidDerivationPath("Maximum depth exceeded".to_string())
        })?;

        Ok(ExtendedKey {
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number: index,
            chain_code: i_r,
            private_key,
            public_key,
            network: self.network,
        })
    }

    /// Derive along a path, stopping at the first failing segment
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedKey, Error> {
        path.iter()
            .try_fold(self.clone(), |key, &child| key.derive_child(child))
    }

    /// 0x-prefixed hex of the private key, if present
    pub fn private_key_hex(&self) -> Option<String> {
        self.private_key
            .as_ref()
            .map(|sk| utils::hex_prefixed(&sk.secret_bytes()))
    }

    /// 0x-prefixed hex of the 33-byte compressed public key
    pub fn public_key_hex(&self) -> String {
        utils::hex_prefixed(&self.public_key.serialize())
    }

    fn serialize(&self, version: [u8; 4], key_data: &[u8; 33]) -> String {
        let mut data = Vec::with_capacity(EXTENDED_KEY_LEN);
        data.extend_from_slice(&version);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data.extend_from_slice(key_data);
        utils::base58check_encode(&data)
    }

    /// Base58 extended private key (xprv/tprv), None for neutered nodes
    pub fn to_xprv(&self) -> Option<String> {
        self.private_key.as_ref().map(|sk| {
            let mut key_data = [0u8; 33];
            key_data[1..].copy_from_slice(&sk.secret_bytes());
            self.serialize(self.network.xprv_version(), &key_data)
        })
    }

    /// Base58 extended public key (xpub/tpub)
    pub fn to_xpub(&self) -> String {
        self.serialize(self.network.xpub_version(), &self.public_key.serialize())
    }

    /// Parse an xprv/xpub/tprv/tpub string
    pub fn from_string(encoded: &str) -> Result<Self, Error> {
        let data = utils::base58check_decode(encoded)?;

        if data.len() != EXTENDED_KEY_LEN {
            return Err(Error::InvalidExtendedKey(
                "Invalid extended key length".to_string(),
            ));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&data[0..4]);

        let (network, private) = [Network::Bitcoin, Network::Testnet]
            .into_iter()
            .find_map(|network| {
                if version == network.xprv_version() {
                    Some((network, true))
                } else if version == network.xpub_version() {
                    Some((network, false))
                } else {
                    None
                }
            })
            .ok_or_else(|| Error::InvalidExtendedKey("Invalid version bytes".to_string()))?;

        let depth = data[4];

        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&data[5..9]);

        let mut child_number_bytes = [0u8; 4];
        child_number_bytes.copy_from_slice(&data[9..13]);
        let child_number = u32::from_be_bytes(child_number_bytes);

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);

        let (private_key, public_key) = if private {
            if data[45] != 0 {
                return Err(Error::InvalidExtendedKey(
                    "Invalid private key prefix".to_string(),
                ));
            }
            let sk = SecretKey::from_slice(&data[46..78])
                .map_err(|_| Error::InvalidKey("Invalid private key".to_string()))?;
            (Some(sk), PublicKey::from_secret_key(&Secp256k1::new(), &sk))
        } else {
            let pk = PublicKey::from_slice(&data[45..78])
                .map_err(|_| Error::InvalidKey("Invalid public key".to_string()))?;
            (None, pk)
        };

        Ok(ExtendedKey {
            depth,
            parent_fingerprint,
            child_number,
            chain_code,
            private_key,
            public_key,
            network,
        })
    }
}

impl FromStr for ExtendedKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExtendedKey::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const SEED_1: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");

    fn master() -> ExtendedKey {
        ExtendedKey::new_master(&SEED_1, Network::Bitcoin).unwrap()
    }

    #[test]
    fn test_vector_1_master() {
        let master = master();
        assert_eq!(
            master.to_xprv().unwrap(),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
        assert_eq!(
            master.to_xpub(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn test_vector_1_children() {
        let child = master().derive_path(&"m/0h".parse().unwrap()).unwrap();
        assert_eq!(
            child.to_xprv().unwrap(),
            "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7"
        );
        assert_eq!(
            child.to_xpub(),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );

        let grandchild = child.derive(1, false).unwrap();
        assert_eq!(
            grandchild.to_xprv().unwrap(),
            "xprv9wTYmMFdV23N2TdNG573QoEsfRrWKQgWeibmLntzniatZvR9BmLnvSxqu53Kw1UmYPxLgboyZQaXwTCg8MSY3H2EU4pWcQDnRnrVA1xe8fs"
        );

        // CKDpub on the neutered parent lands on the same public node
        let public_grandchild = child.neuter().derive(1, false).unwrap();
        assert_eq!(
            public_grandchild.to_xpub(),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
        assert_eq!(public_grandchild, grandchild.neuter());
    }

    #[test]
    fn test_hardened_from_neutered_node_fails() {
        let xpub = master().neuter();
        assert!(xpub.is_neutered());
        assert!(xpub.to_xprv().is_none());
        assert!(matches!(
            xpub.derive(0, true),
            Err(Error::PublicDerivationUnavailable)
        ));
        assert!(matches!(
            xpub.derive_path(&"m/0/1'/2".parse().unwrap()),
            Err(Error::PublicDerivationUnavailable)
        ));
    }

    #[test]
    fn test_parent_is_unchanged_by_derivation() {
        let master = master();
        let before = master.clone();
        let _ = master.derive(7, true).unwrap();
        assert_eq!(master, before);
    }

    #[test]
    fn test_child_metadata() {
        let master = master();
        let child = master.derive(44, true).unwrap();
        assert_eq!(child.depth, 1);
        assert_eq!(child.child_number, 0x8000002c);
        assert_eq!(child.parent_fingerprint, master.fingerprint());
        assert_eq!(master.fingerprint(), hex!("3442193e"));
    }

    #[test]
    fn test_extended_key_parsing() {
        let master = master();
        let parsed: ExtendedKey = master.to_xprv().unwrap().parse().unwrap();
        assert_eq!(parsed, master);

        let parsed_pub = ExtendedKey::from_string(&master.to_xpub()).unwrap();
        assert_eq!(parsed_pub, master.neuter());

        assert!(ExtendedKey::from_string("xpub123").is_err());
    }

    #[test]
    fn test_derivation_path_parsing() {
        let path: DerivationPath = "m/44'/0'/0'/0/0".parse().unwrap();
        assert_eq!(
            path.path,
            vec![
                ChildNumber::Hardened(44),
                ChildNumber::Hardened(0),
                ChildNumber::Hardened(0),
                ChildNumber::Normal(0),
                ChildNumber::Normal(0),
            ]
        );
        assert_eq!(path.to_string(), "m/44'/0'/0'/0/0");

        assert!("m".parse::<DerivationPath>().unwrap().is_empty());
        assert!("44'/0'".parse::<DerivationPath>().is_err());
        assert!("m44".parse::<DerivationPath>().is_err());
        assert!("m/2147483648".parse::<DerivationPath>().is_err());
        assert!("m/x".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn test_child_number_conversions() {
        assert_eq!(ChildNumber::Hardened(0).to_u32(), 0x80000000);
        assert_eq!(ChildNumber::from(0x80000005), ChildNumber::Hardened(5));
        assert_eq!(ChildNumber::from(5), ChildNumber::Normal(5));
        assert!(ChildNumber::new(0x80000000, false).is_err());

        assert_eq!(ChildNumber::Hardened(44).index(), 44);
        assert_eq!(ChildNumber::Normal(7).index(), 7);
        assert_eq!(ChildNumber::Hardened(44).to_string(), "44'");
        assert_eq!(ChildNumber::Normal(7).to_string(), "7");
    }

    #[test]
    fn test_path_builder() {
        let path = DerivationPath::master()
            .child(ChildNumber::Hardened(84))
            .child(ChildNumber::Normal(1));
        assert_eq!(path.to_string(), "m/84'/1");
        assert_eq!(path, "m/84h/1".parse::<DerivationPath>().unwrap());
    }
}
