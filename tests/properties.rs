use bech32::{segwit, Fe32};
use hdwallet_explorer::address::ScriptVariant;
use hdwallet_explorer::bip32::{ChildNumber, DerivationPath, ExtendedKey, Network};
use hdwallet_explorer::mnemonic::{Checksum, Mnemonic};
use hdwallet_explorer::step::StepOutput;
use hdwallet_explorer::utils;
use hdwallet_explorer::{Error, FixedEntropy, Session, SessionConfig, SessionKind};
use proptest::prelude::*;

fn master(seed: &[u8; 32]) -> ExtendedKey {
    ExtendedKey::new_master(seed, Network::Bitcoin).unwrap()
}

fn child_number() -> impl Strategy<Value = ChildNumber> {
    (0u32..=ChildNumber::MAX_NORMAL_INDEX, any::<bool>())
        .prop_map(|(index, hardened)| ChildNumber::new(index, hardened).unwrap())
}

fn normal_child_number() -> impl Strategy<Value = ChildNumber> {
    (0u32..=ChildNumber::MAX_NORMAL_INDEX).prop_map(ChildNumber::Normal)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mnemonic_round_trip(entropy in any::<[u8; 16]>()) {
        let mnemonic = Mnemonic::from_entropy(&entropy).unwrap();
        let decoded = Mnemonic::from_phrase(&mnemonic.phrase()).unwrap();
        prop_assert_eq!(decoded.entropy(), &entropy[..]);
    }

    #[test]
    fn decode_succeeds_iff_checksum_matches(entropy in any::<[u8; 16]>(), last in 0usize..2048) {
        // swap the last word, which carries 7 entropy bits and the 4 checksum bits
        let mnemonic = Mnemonic::from_entropy(&entropy).unwrap();
        let list = bip39::Language::English.word_list();
        let mut words: Vec<&str> = mnemonic.words().to_vec();
        words[11] = list[last];

        let mut candidate = entropy;
        candidate[15] = (candidate[15] & 0x80) | (last >> 4) as u8;
        let expected_valid = Checksum::of(&candidate).unwrap().value() as usize == (last & 0x0f);

        match Mnemonic::from_phrase(&words.join(" ")) {
            Ok(decoded) => {
                prop_assert!(expected_valid);
                prop_assert_eq!(decoded.entropy(), &candidate[..]);
            }
            Err(Error::InvalidMnemonic(_)) => prop_assert!(!expected_valid),
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    #[test]
    fn path_composition(
        seed in any::<[u8; 32]>(),
        first in prop::collection::vec(child_number(), 0..4),
        second in prop::collection::vec(child_number(), 0..4),
    ) {
        let root = master(&seed);
        let p1 = DerivationPath::from(first);
        let p2 = DerivationPath::from(second);

        let whole = root.derive_path(&p1.extend(&p2)).unwrap();
        let stepwise = root.derive_path(&p1).unwrap().derive_path(&p2).unwrap();
        prop_assert_eq!(whole, stepwise);
    }

    #[test]
    fn public_path_composition(
        seed in any::<[u8; 32]>(),
        prefix in prop::collection::vec(child_number(), 0..3),
        suffix in prop::collection::vec(normal_child_number(), 0..3),
    ) {
        let node = master(&seed).derive_path(&DerivationPath::from(prefix)).unwrap();
        let suffix = DerivationPath::from(suffix);

        let private_then_neuter = node.derive_path(&suffix).unwrap().neuter();
        let neuter_then_public = node.neuter().derive_path(&suffix).unwrap();
        prop_assert_eq!(private_then_neuter, neuter_then_public);
    }

    #[test]
    fn neuter_commutes_with_normal_derivation(seed in any::<[u8; 32]>(), index in 0u32..=ChildNumber::MAX_NORMAL_INDEX) {
        let node = master(&seed);
        let lhs = node.derive(index, false).unwrap().neuter();
        let rhs = node.neuter().derive(index, false).unwrap();
        prop_assert_eq!(lhs, rhs);

        prop_assert!(matches!(
            node.neuter().derive(index, true),
            Err(Error::PublicDerivationUnavailable)
        ));
    }
}

fn bitcoin_addresses(entropy: [u8; 16]) -> Vec<(ScriptVariant, String)> {
    let mut session = Session::with_entropy_source(
        SessionKind::BitcoinExplore,
        SessionConfig::default(),
        Box::new(FixedEntropy(entropy)),
    )
    .unwrap();
    session.run_to_end().unwrap();
    match session.output(6) {
        Some(StepOutput::AddressKeys { addresses, .. }) => addresses
            .iter()
            .map(|info| (info.variant, info.address.clone()))
            .collect(),
        other => panic!("unexpected address step output {:?}", other),
    }
}

#[test]
fn script_variant_addresses_differ_and_decode() {
    for entropy in [[0u8; 16], [0x7f; 16], [0xa5; 16]] {
        let addresses = bitcoin_addresses(entropy);
        assert_eq!(addresses.len(), 4);

        for (i, (_, a)) in addresses.iter().enumerate() {
            for (_, b) in &addresses[i + 1..] {
                assert_ne!(a, b);
            }
        }

        for (variant, address) in &addresses {
            match variant {
                ScriptVariant::Legacy => {
                    let payload = utils::base58check_decode(address).unwrap();
                    assert_eq!((payload[0], payload.len()), (0x00, 21));
                }
                ScriptVariant::Segwit => {
                    let payload = utils::base58check_decode(address).unwrap();
                    assert_eq!((payload[0], payload.len()), (0x05, 21));
                }
                ScriptVariant::NativeSegwit => {
                    let (_, version, program) = segwit::decode(address).unwrap();
                    assert_eq!(version, Fe32::Q);
                    assert_eq!(program.len(), 20);
                }
                ScriptVariant::Taproot => {
                    // illustrative stub, exempt from BIP341/bech32m validation
                    assert!(address.starts_with("bc1p"));
                    assert_eq!(address.len(), 44);
                }
            }
        }
    }
}

#[test]
fn session_replay_is_deterministic() {
    assert_eq!(bitcoin_addresses([0x11; 16]), bitcoin_addresses([0x11; 16]));
}
