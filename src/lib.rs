// HD wallet derivation explorer
// Walks BIP-39 entropy -> mnemonic -> seed, BIP-32 key trees and BIP-44/49/84/86
// paths one inspectable step at a time, for Ethereum and Bitcoin addresses.

pub mod address;
pub mod bip32;
pub mod bip44;
pub mod config;
pub mod entropy;
pub mod error;
pub mod mnemonic;
pub mod session;
pub mod step;
pub mod utils;

pub use address::{AddressInfo, AddressKind, ScriptVariant};
pub use bip32::{ChildNumber, DerivationPath, ExtendedKey, Network};
pub use bip44::{AccountLevel, AddressIndex, Bip44Path, Change, CoinType, Purpose};
pub use config::SessionConfig;
pub use entropy::{EntropySource, FixedEntropy, OsEntropy};
pub use error::Error;
pub use mnemonic::{validate_mnemonic, Mnemonic, Seed, WordCount};
pub use session::{start_session, Session, SessionKind, WalletDetails};
pub use step::{StepKind, StepOutput, StepRecord};

// Re-export types from dependencies that are part of our public API
pub use secp256k1::{self, PublicKey, SecretKey};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_mnemonic_generation() {
        let entropy = OsEntropy.generate().unwrap();
        let mnemonic = Mnemonic::from_entropy(&entropy).unwrap();
        assert_eq!(mnemonic.words().len(), 12);
        assert!(validate_mnemonic(&mnemonic.phrase()));
    }

    #[test]
    fn test_mnemonic_validation() {
        let mnemonic = Mnemonic::from_phrase(ABANDON_ABOUT).unwrap();
        assert_eq!(mnemonic.phrase(), ABANDON_ABOUT);

        let invalid_phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon invalid";
        assert!(Mnemonic::from_phrase(invalid_phrase).is_err());
    }

    #[test]
    fn test_key_derivation() {
        let seed = Mnemonic::from_phrase(ABANDON_ABOUT).unwrap().to_seed("");
        let master_key = ExtendedKey::new_master(seed.as_bytes(), Network::Bitcoin).unwrap();

        let path = AddressKind::Bitcoin(ScriptVariant::Legacy).path(AddressIndex::new(0).unwrap());
        let child_key = master_key.derive_path(&path.to_derivation_path()).unwrap();
        assert_eq!(child_key.depth, 5);
        assert_eq!(
            AddressKind::Bitcoin(ScriptVariant::Legacy)
                .encode(&child_key.public_key, Network::Bitcoin)
                .unwrap(),
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"
        );
    }

    #[test]
    fn test_ethereum_known_vector() {
        let seed = Mnemonic::from_phrase(ABANDON_ABOUT).unwrap().to_seed("");
        let master_key = ExtendedKey::new_master(seed.as_bytes(), Network::Bitcoin).unwrap();
        let key = master_key
            .derive_path(&DerivationPath::from_str("m/44'/60'/0'/0/0").unwrap())
            .unwrap();

        assert_eq!(
            key.private_key_hex().unwrap(),
            "0x1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
        );
        assert_eq!(
            address::ethereum_address(&key.public_key),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
    }

    #[test]
    fn test_hardened_derivation() {
        let seed = Mnemonic::from_phrase(ABANDON_ABOUT).unwrap().to_seed("");
        let master_key = ExtendedKey::new_master(seed.as_bytes(), Network::Bitcoin).unwrap();

        let child_key = master_key.derive_child(ChildNumber::Hardened(0)).unwrap();
        assert_eq!(child_key.depth, 1);
        assert!(child_key.child_number >= 0x80000000);
    }

    #[test]
    fn test_session_entry_point() {
        let mut session = start_session(SessionKind::EthereumImport, SessionConfig::default()).unwrap();
        let wallet = session.import(ABANDON_ABOUT).unwrap();
        assert!(address::is_valid_eth_address(&wallet.address));
    }
}
