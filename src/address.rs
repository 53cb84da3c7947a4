use crate::bip32::Network;
use crate::bip44::{AddressIndex, Bip44Path, CoinType, Purpose};
use crate::error::Error;
use crate::utils;
use bech32::{hrp, segwit, Fe32, Hrp};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bitcoin output script family an address is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptVariant {
    /// P2PKH
    #[default]
    Legacy,
    /// P2SH-P2WPKH
    Segwit,
    /// P2WPKH
    NativeSegwit,
    /// P2TR placeholder
    Taproot,
}

impl ScriptVariant {
    pub const ALL: [ScriptVariant; 4] = [
        ScriptVariant::Legacy,
        ScriptVariant::Segwit,
        ScriptVariant::NativeSegwit,
        ScriptVariant::Taproot,
    ];

    /// BIP purpose fixing the path prefix for this variant
    pub fn purpose(&self) -> Purpose {
        match self {
            ScriptVariant::Legacy => Purpose::BIP44,
            ScriptVariant::Segwit => Purpose::BIP49,
            ScriptVariant::NativeSegwit => Purpose::BIP84,
            ScriptVariant::Taproot => Purpose::BIP86,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScriptVariant::Legacy => "legacy",
            ScriptVariant::Segwit => "segwit",
            ScriptVariant::NativeSegwit => "native-segwit",
            ScriptVariant::Taproot => "taproot",
        }
    }
}

impl fmt::Display for ScriptVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScriptVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScriptVariant::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::UnsupportedParameter(format!("unknown script variant '{}'", s))
            })
    }
}

/// A (coin, script variant) pair: fixes both the path template and the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Ethereum,
    Bitcoin(ScriptVariant),
}

impl AddressKind {
    pub fn coin_type(&self) -> CoinType {
        match self {
            AddressKind::Ethereum => CoinType::ETHEREUM,
            AddressKind::Bitcoin(_) => CoinType::BITCOIN,
        }
    }

    pub fn purpose(&self) -> Purpose {
        match self {
            AddressKind::Ethereum => Purpose::BIP44,
            AddressKind::Bitcoin(variant) => variant.purpose(),
        }
    }

    /// Receiving-chain path for `index`, e.g. m/84'/0'/0'/0/index
    pub fn path(&self, index: AddressIndex) -> Bip44Path {
        Bip44Path::receiving(self.purpose(), self.coin_type(), index)
    }

    pub fn encode(&self, public_key: &PublicKey, network: Network) -> Result<String, Error> {
        match self {
            AddressKind::Ethereum => Ok(ethereum_address(public_key)),
            AddressKind::Bitcoin(ScriptVariant::Legacy) => Ok(p2pkh_address(public_key, network)),
            AddressKind::Bitcoin(ScriptVariant::Segwit) => {
                Ok(p2sh_p2wpkh_address(public_key, network))
            }
            AddressKind::Bitcoin(ScriptVariant::NativeSegwit) => {
                p2wpkh_address(public_key, network)
            }
            AddressKind::Bitcoin(ScriptVariant::Taproot) => {
                Ok(taproot_stub_address(public_key, network))
            }
        }
    }
}

/// One rendered Bitcoin address with the path template it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub variant: ScriptVariant,
    pub derivation_path: String,
    pub address: String,
}

impl AddressInfo {
    /// Render `public_key` under every script variant. The key itself comes
    /// from a single path; each entry still names its own variant's template.
    pub fn all_variants(
        public_key: &PublicKey,
        index: AddressIndex,
        network: Network,
    ) -> Result<Vec<AddressInfo>, Error> {
        ScriptVariant::ALL
            .into_iter()
            .map(|variant| {
                let kind = AddressKind::Bitcoin(variant);
                Ok(AddressInfo {
                    variant,
                    derivation_path: kind.path(index).to_string(),
                    address: kind.encode(public_key, network)?,
                })
            })
            .collect()
    }
}

fn p2pkh_version(network: Network) -> u8 {
    match network {
        Network::Bitcoin => 0x00,
        Network::Testnet => 0x6f,
    }
}

fn p2sh_version(network: Network) -> u8 {
    match network {
        Network::Bitcoin => 0x05,
        Network::Testnet => 0xc4,
    }
}

fn segwit_hrp(network: Network) -> Hrp {
    match network {
        Network::Bitcoin => hrp::BC,
        Network::Testnet => hrp::TB,
    }
}

fn versioned_base58(version: u8, hash: &[u8; 20]) -> String {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(hash);
    utils::base58check_encode(&data)
}

/// EIP-55 mixed-case checksum encoding of a 20-byte address
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = utils::keccak256(lower.as_bytes());
    let checksummed: String = lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = (hash[i / 2] >> if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();
    format!("0x{}", checksummed)
}

/// Ethereum address of a secp256k1 public key
pub fn ethereum_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = utils::keccak256(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    to_checksum_address(&address)
}

/// Whether `s` is a 0x-prefixed 20-byte hex address. Mixed-case input must
/// carry a valid EIP-55 checksum; all-lowercase or all-uppercase is accepted.
pub fn is_valid_eth_address(s: &str) -> bool {
    let Some(body) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) else {
        return false;
    };
    if body.len() != 40 {
        return false;
    }
    let Ok(bytes) = hex::decode(body) else {
        return false;
    };

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let mut address = [0u8; 20];
        address.copy_from_slice(&bytes);
        return to_checksum_address(&address)[2..] == *body;
    }
    true
}

/// P2PKH: Base58Check(version || HASH160(compressed key))
pub fn p2pkh_address(public_key: &PublicKey, network: Network) -> String {
    let hash = utils::hash160(&public_key.serialize());
    versioned_base58(p2pkh_version(network), &hash)
}

/// P2SH-P2WPKH: the redeem script is `OP_0 <20-byte key hash>`
pub fn p2sh_p2wpkh_address(public_key: &PublicKey, network: Network) -> String {
    let mut redeem_script = Vec::with_capacity(22);
    redeem_script.push(0x00);
    redeem_script.push(0x14);
    redeem_script.extend_from_slice(&utils::hash160(&public_key.serialize()));
    let script_hash = utils::hash160(&redeem_script);
    versioned_base58(p2sh_version(network), &script_hash)
}

/// P2WPKH: witness version 0 program of the key hash, bech32
pub fn p2wpkh_address(public_key: &PublicKey, network: Network) -> Result<String, Error> {
    let program = utils::hash160(&public_key.serialize());
    segwit::encode(segwit_hrp(network), Fe32::Q, &program)
        .map_err(|e| Error::AddressEncoding(e.to_string()))
}

/// NOT a BIP-341 address. `bc1p` (or `tb1p`) followed by the first 40 hex
/// characters of the key's x-coordinate: no output-key tweak, no bech32m
/// checksum. Shown for illustration only and will not decode in any wallet.
pub fn taproot_stub_address(public_key: &PublicKey, network: Network) -> String {
    let x_only = &public_key.serialize()[1..33];
    let prefix = match network {
        Network::Bitcoin => "bc1p",
        Network::Testnet => "tb1p",
    };
    format!("{}{}", prefix, &hex::encode(x_only)[..40])
}
