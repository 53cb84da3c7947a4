use crate::address::{AddressInfo, ScriptVariant};
use crate::bip32::{DerivationPath, ExtendedKey};
use crate::bip44::Bip44Path;
use crate::mnemonic::{Checksum, Mnemonic, Seed, WordAnnotation};
use crate::session::WalletDetails;
use crate::utils;
use secp256k1::PublicKey;
use serde::Serialize;
use std::fmt;

/// User-adjustable inputs a step may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    AddressIndex,
    ScriptVariant,
}

/// An input a step consumes: the output of an earlier step, or a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Step(StepKind),
    Param(Param),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    GenerateEntropy,
    ComputeChecksum,
    EncodeMnemonic,
    DeriveSeed,
    DerivePrivateKey,
    DerivePublicKey,
    DeriveAddress,
    Complete,
    DeriveMasterKeys,
    DeriveAccountKeys,
    DeriveAddressKeys,
}

/// Ethereum "create" walkthrough
pub const ETHEREUM_CREATE: [StepKind; 8] = [
    StepKind::GenerateEntropy,
    StepKind::ComputeChecksum,
    StepKind::EncodeMnemonic,
    StepKind::DeriveSeed,
    StepKind::DerivePrivateKey,
    StepKind::DerivePublicKey,
    StepKind::DeriveAddress,
    StepKind::Complete,
];

/// Bitcoin address exploration walkthrough
pub const BITCOIN_EXPLORE: [StepKind; 7] = [
    StepKind::GenerateEntropy,
    StepKind::ComputeChecksum,
    StepKind::EncodeMnemonic,
    StepKind::DeriveSeed,
    StepKind::DeriveMasterKeys,
    StepKind::DeriveAccountKeys,
    StepKind::DeriveAddressKeys,
];

impl StepKind {
    pub fn title(&self) -> &'static str {
        match self {
            StepKind::GenerateEntropy => "Generate Entropy",
            StepKind::ComputeChecksum => "Calculate Checksum",
            StepKind::EncodeMnemonic => "Generate Mnemonic",
            StepKind::DeriveSeed => "Derive Seed",
            StepKind::DerivePrivateKey => "Derive Private Key",
            StepKind::DerivePublicKey => "Derive Public Key",
            StepKind::DeriveAddress => "Derive Address",
            StepKind::Complete => "Wallet Complete",
            StepKind::DeriveMasterKeys => "Derive Master Keys",
            StepKind::DeriveAccountKeys => "Derive Account Keys",
            StepKind::DeriveAddressKeys => "Derive Address Keys",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StepKind::GenerateEntropy => {
                "Create a random 128-bit entropy (16 bytes) for wallet generation."
            }
            StepKind::ComputeChecksum => {
                "Calculate the first byte of SHA256 hash of entropy as checksum."
            }
            StepKind::EncodeMnemonic => "Convert entropy + checksum to a BIP39 mnemonic phrase.",
            StepKind::DeriveSeed => "Derive a seed from the mnemonic phrase.",
            StepKind::DerivePrivateKey => {
                "Generate a private key from the seed using the Ethereum derivation path."
            }
            StepKind::DerivePublicKey => "Generate a public key from the private key.",
            StepKind::DeriveAddress => "Generate the Ethereum address from the public key.",
            StepKind::Complete => "Review your wallet details and complete the process.",
            StepKind::DeriveMasterKeys => {
                "Generate master extended private key (xprv) and public key (xpub) from the seed."
            }
            StepKind::DeriveAccountKeys => {
                "Derive account-level extended keys using the purpose field."
            }
            StepKind::DeriveAddressKeys => {
                "Generate address-specific keys and different types of Bitcoin addresses."
            }
        }
    }

    /// Everything this step reads. Recomputation after a parameter change
    /// follows these edges.
    pub fn dependencies(&self) -> &'static [Dependency] {
        use Dependency::{Param as P, Step as S};
        match self {
            StepKind::GenerateEntropy => &[],
            StepKind::ComputeChecksum => &[S(StepKind::GenerateEntropy)],
            StepKind::EncodeMnemonic => &[S(StepKind::GenerateEntropy)],
            StepKind::DeriveSeed => &[S(StepKind::EncodeMnemonic)],
            StepKind::DerivePrivateKey => &[S(StepKind::DeriveSeed), P(Param::AddressIndex)],
            StepKind::DerivePublicKey => &[S(StepKind::DerivePrivateKey)],
            StepKind::DeriveAddress => &[S(StepKind::DerivePublicKey)],
            StepKind::Complete => &[
                S(StepKind::EncodeMnemonic),
                S(StepKind::DerivePrivateKey),
                S(StepKind::DeriveAddress),
            ],
            StepKind::DeriveMasterKeys => &[S(StepKind::DeriveSeed)],
            StepKind::DeriveAccountKeys => {
                &[S(StepKind::DeriveMasterKeys), P(Param::ScriptVariant)]
            }
            StepKind::DeriveAddressKeys => &[
                S(StepKind::DeriveAccountKeys),
                P(Param::AddressIndex),
                P(Param::ScriptVariant),
            ],
        }
    }

    pub fn depends_on_param(&self, param: Param) -> bool {
        self.dependencies().contains(&Dependency::Param(param))
    }

    pub fn depends_on_step(&self, step: StepKind) -> bool {
        self.dependencies().contains(&Dependency::Step(step))
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Typed result of one executed step
#[derive(Debug, Clone)]
pub enum StepOutput {
    Entropy {
        bytes: Vec<u8>,
    },
    Checksum(Checksum),
    Mnemonic {
        mnemonic: Mnemonic,
        words: Vec<WordAnnotation>,
    },
    Seed(Seed),
    PrivateKey {
        path: Bip44Path,
        key: ExtendedKey,
    },
    PublicKey(PublicKey),
    EthereumAddress(String),
    Complete(WalletDetails),
    MasterKeys(ExtendedKey),
    AccountKeys {
        path: DerivationPath,
        key: ExtendedKey,
    },
    AddressKeys {
        path: Bip44Path,
        selected: ScriptVariant,
        key: ExtendedKey,
        addresses: Vec<AddressInfo>,
    },
}

fn write_extended_pair(f: &mut fmt::Formatter, level: &str, key: &ExtendedKey) -> fmt::Result {
    writeln!(f, "{} Extended Private Key (xprv):", level)?;
    writeln!(f, "{}", key.to_xprv().unwrap_or_else(|| "(neutered)".to_string()))?;
    writeln!(f)?;
    writeln!(f, "{} Extended Public Key (xpub):", level)?;
    writeln!(f, "{}", key.to_xpub())?;
    writeln!(f)
}

impl fmt::Display for StepOutput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepOutput::Entropy { bytes } => write!(
                f,
                "Hex: {}\nBinary: {}",
                utils::hex_prefixed(bytes),
                utils::to_binary_string(bytes)
            ),
            StepOutput::Checksum(checksum) => write!(
                f,
                "Entropy Hash: {}\nChecksum (first byte): {:02x}\nChecksum Binary: {:08b}\nChecksum bits used: {}",
                utils::hex_prefixed(&checksum.hash),
                checksum.byte(),
                checksum.byte(),
                checksum.bits
            ),
            StepOutput::Mnemonic { words, .. } => {
                let lines: Vec<String> = words.iter().map(|w| w.to_string()).collect();
                f.write_str(&lines.join("\n"))
            }
            StepOutput::Seed(seed) => f.write_str(&seed.to_hex()),
            StepOutput::PrivateKey { path, key } => write!(
                f,
                "Derivation Path:\n{}\n\nPrivate Key: {}",
                path.explain(),
                key.private_key_hex().unwrap_or_default()
            ),
            StepOutput::PublicKey(public_key) => {
                f.write_str(&utils::hex_prefixed(&public_key.serialize()))
            }
            StepOutput::EthereumAddress(address) => f.write_str(address),
            StepOutput::Complete(details) => {
                write!(
                    f,
                    "Wallet Details:\n\nAddress: {}\nPrivate Key: {}\nPublic Key: {}\n\n",
                    details.address, details.private_key_hex, details.public_key_hex
                )?;
                if let Some(mnemonic) = &details.mnemonic {
                    write!(f, "Mnemonic Phrase:\n{}\n\n", mnemonic)?;
                }
                write!(
                    f,
                    "Derivation Path: {}\n\nIMPORTANT: Save your mnemonic phrase and private key securely!",
                    details.derivation_path
                )
            }
            StepOutput::MasterKeys(key) => {
                write_extended_pair(f, "Master", key)?;
                write!(
                    f,
                    "Note: The xprv can derive all child keys, while the xpub can only derive public keys."
                )
            }
            StepOutput::AccountKeys { path, key } => {
                writeln!(f, "Account Path: {}", path)?;
                writeln!(f)?;
                write_extended_pair(f, "Account", key)?;
                write!(
                    f,
                    "Note: Account-level keys can derive all addresses for this account."
                )
            }
            StepOutput::AddressKeys {
                path,
                selected,
                key,
                addresses,
            } => {
                writeln!(f, "Address Path: {} ({})", path, selected)?;
                writeln!(f)?;
                writeln!(f, "Private Key: {}", key.private_key_hex().unwrap_or_default())?;
                writeln!(f)?;
                writeln!(f, "Public Key: {}", key.public_key_hex())?;
                writeln!(f)?;
                write!(f, "Generated Addresses:")?;
                for info in addresses {
                    write!(
                        f,
                        "\n{} Address:\nDerivation Path: {}\nAddress: {}\n",
                        info.variant.label().to_uppercase(),
                        info.derivation_path,
                        info.address
                    )?;
                    if info.variant == ScriptVariant::Taproot {
                        writeln!(
                            f,
                            "(illustrative only: not a BIP341 tweaked output key, do not send funds)"
                        )?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A step as shown to the user: position, title, description and payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub kind: StepKind,
    pub title: &'static str,
    pub description: &'static str,
    pub payload: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_dependency_precedes_it() {
        for plan in [&ETHEREUM_CREATE[..], &BITCOIN_EXPLORE[..]] {
            for (i, step) in plan.iter().enumerate() {
                for dep in step.dependencies() {
                    if let Dependency::Step(upstream) = dep {
                        let pos = plan.iter().position(|s| s == upstream).unwrap();
                        assert!(pos < i, "{} depends on later step {}", step, upstream);
                    }
                }
            }
        }
    }

    #[test]
    fn test_upstream_steps_ignore_parameters() {
        for step in &ETHEREUM_CREATE[..4] {
            assert!(!step.depends_on_param(Param::AddressIndex));
            assert!(!step.depends_on_param(Param::ScriptVariant));
        }
        assert!(StepKind::DerivePrivateKey.depends_on_param(Param::AddressIndex));
        assert!(StepKind::DeriveAccountKeys.depends_on_param(Param::ScriptVariant));
        assert!(!StepKind::DeriveAccountKeys.depends_on_param(Param::AddressIndex));
    }
}
