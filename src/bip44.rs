use crate::bip32::{ChildNumber, DerivationPath};
use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Purpose level (first hardened segment), naming the BIP that defines the
/// rest of the path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Purpose(pub u32);

impl Purpose {
    /// BIP-44 purpose (44'), legacy P2PKH and Ethereum
    pub const BIP44: Purpose = Purpose(44);
    /// BIP-49 purpose (49'), P2SH-wrapped segwit
    pub const BIP49: Purpose = Purpose(49);
    /// BIP-84 purpose (84'), native segwit
    pub const BIP84: Purpose = Purpose(84);
    /// BIP-86 purpose (86'), taproot
    pub const BIP86: Purpose = Purpose(86);

    /// Get the derivation path element
    pub fn child_number(&self) -> ChildNumber {
        ChildNumber::Hardened(self.0)
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}'", self.0)
    }
}

/// Coin type as registered in SLIP-44
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinType(pub u32);

impl CoinType {
    /// Bitcoin (0')
    pub const BITCOIN: CoinType = CoinType(0);
    /// Ethereum (60')
    pub const ETHEREUM: CoinType = CoinType(60);

    /// Get the derivation path element
    pub fn child_number(&self) -> ChildNumber {
        ChildNumber::Hardened(self.0)
    }

    pub fn name(&self) -> &'static str {
        match *self {
            CoinType::BITCOIN => "Bitcoin",
            CoinType::ETHEREUM => "Ethereum",
            _ => "Unregistered",
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}'", self.0)
    }
}

/// Account level as defined in BIP-44
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountLevel(pub u32);

impl AccountLevel {
    /// Create a new account level
    pub fn new(value: u32) -> Self {
        AccountLevel(value)
    }

    /// Get the derivation path element
    pub fn child_number(&self) -> ChildNumber {
        ChildNumber::Hardened(self.0)
    }
}

impl fmt::Display for AccountLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}'", self.0)
    }
}

/// Change level as defined in BIP-44
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// External chain (0) - addresses for receiving payments
    External,
    /// Internal chain (1) - addresses for change
    Internal,
}

impl Change {
    /// Get the derivation path element
    pub fn child_number(&self) -> ChildNumber {
        match self {
            Change::External => ChildNumber::Normal(0),
            Change::Internal => ChildNumber::Normal(1),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Change::External => write!(f, "0"),
            Change::Internal => write!(f, "1"),
        }
    }
}

/// Address index, the only user-adjustable level. Always non-hardened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressIndex(u32);

impl AddressIndex {
    /// Create an address index, rejecting values in the hardened range
    pub fn new(value: u32) -> Result<Self, Error> {
        if value > ChildNumber::MAX_NORMAL_INDEX {
            return Err(Error::InvalidDerivationPath(format!(
                "address index {} exceeds {}",
                value,
                ChildNumber::MAX_NORMAL_INDEX
            )));
        }
        Ok(AddressIndex(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Get the derivation path element
    pub fn child_number(&self) -> ChildNumber {
        ChildNumber::Normal(self.0)
    }
}

impl fmt::Display for AddressIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// m / purpose' / coin_type' / account' / change / address_index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bip44Path {
    pub purpose: Purpose,
    pub coin_type: CoinType,
    pub account: AccountLevel,
    pub change: Change,
    pub address_index: AddressIndex,
}

impl Bip44Path {
    /// First account, receiving chain, at the given index
    pub fn receiving(purpose: Purpose, coin_type: CoinType, address_index: AddressIndex) -> Self {
        Bip44Path {
            purpose,
            coin_type,
            account: AccountLevel::new(0),
            change: Change::External,
            address_index,
        }
    }

    /// The account-level prefix m / purpose' / coin_type' / account'
    pub fn account_path(&self) -> DerivationPath {
        DerivationPath::master()
            .child(self.purpose.child_number())
            .child(self.coin_type.child_number())
            .child(self.account.child_number())
    }

    /// The trailing change / address_index segments, relative to the account node
    pub fn address_suffix(&self) -> DerivationPath {
        DerivationPath::from(vec![
            self.change.child_number(),
            self.address_index.child_number(),
        ])
    }

    /// Convert to a BIP-32 derivation path
    pub fn to_derivation_path(&self) -> DerivationPath {
        self.account_path().extend(&self.address_suffix())
    }

    /// Multi-line tree naming every level of the path
    pub fn explain(&self) -> String {
        let change = match self.change {
            Change::External => "0 for receiving",
            Change::Internal => "1 for change",
        };
        format!(
            "{path}\n\
             ├── m: master key\n\
             ├── {purpose}: BIP{p} purpose\n\
             ├── {coin}: {coin_name} coin type\n\
             ├── {account}: account index\n\
             ├── {change_level}: change ({change})\n\
             └── {index}: address index",
            path = self,
            purpose = self.purpose,
            p = self.purpose.0,
            coin = self.coin_type,
            coin_name = self.coin_type.name(),
            account = self.account,
            change_level = self.change,
            change = change,
            index = self.address_index,
        )
    }
}

impl FromStr for Bip44Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = DerivationPath::from_str(s)?;

        if path.path.len() != 5 {
            return Err(Error::InvalidDerivationPath(
                "BIP-44 path must have 5 components".to_string(),
            ));
        }

        let hardened = |child: ChildNumber, what: &str| match child {
            ChildNumber::Hardened(n) => Ok(n),
            _ => Err(Error::InvalidDerivationPath(format!(
                "{} must be hardened",
                what
            ))),
        };

        let purpose = Purpose(hardened(path.path[0], "Purpose")?);
        let coin_type = CoinType(hardened(path.path[1], "Coin type")?);
        let account = AccountLevel(hardened(path.path[2], "Account")?);

        let change = match path.path[3] {
            ChildNumber::Normal(0) => Change::External,
            ChildNumber::Normal(1) => Change::Internal,
            _ => {
                return Err(Error::InvalidDerivationPath(
                    "Change must be normal and 0 or 1".to_string(),
                ))
            }
        };

        let address_index = match path.path[4] {
            ChildNumber::Normal(n) => AddressIndex::new(n)?,
            _ => {
                return Err(Error::InvalidDerivationPath(
                    "Address index must be normal".to_string(),
                ))
            }
        };

        Ok(Bip44Path {
            purpose,
            coin_type,
            account,
            change,
            address_index,
        })
    }
}

impl fmt::Display for Bip44Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "m/{}/{}/{}/{}/{}",
            self.purpose, self.coin_type, self.account, self.change, self.address_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bip44_path_round_trip() {
        let path: Bip44Path = "m/84'/0'/0'/1/7".parse().unwrap();
        assert_eq!(path.purpose, Purpose::BIP84);
        assert_eq!(path.coin_type, CoinType::BITCOIN);
        assert_eq!(path.change, Change::Internal);
        assert_eq!(path.address_index.value(), 7);
        assert_eq!(path.to_string(), "m/84'/0'/0'/1/7");
        assert_eq!(path.to_derivation_path().to_string(), "m/84'/0'/0'/1/7");
    }

    #[test]
    fn test_bip44_path_rejects_malformed() {
        assert!("m/44'/0'/0'/0".parse::<Bip44Path>().is_err());
        assert!("m/44/0'/0'/0/0".parse::<Bip44Path>().is_err());
        assert!("m/44'/0'/0'/2/0".parse::<Bip44Path>().is_err());
        assert!("m/44'/0'/0'/0/0'".parse::<Bip44Path>().is_err());
    }

    #[test]
    fn test_account_and_suffix_compose() {
        let path = Bip44Path::receiving(
            Purpose::BIP44,
            CoinType::ETHEREUM,
            AddressIndex::new(3).unwrap(),
        );
        assert_eq!(path.account_path().to_string(), "m/44'/60'/0'");
        assert_eq!(path.address_suffix().to_string(), "m/0/3");
        assert_eq!(path.to_string(), "m/44'/60'/0'/0/3");
    }

    #[test]
    fn test_address_index_range() {
        assert!(AddressIndex::new(ChildNumber::MAX_NORMAL_INDEX).is_ok());
        assert!(AddressIndex::new(ChildNumber::MAX_NORMAL_INDEX + 1).is_err());
    }

    #[test]
    fn test_explain() {
        let path = Bip44Path::receiving(
            Purpose::BIP44,
            CoinType::ETHEREUM,
            AddressIndex::new(2).unwrap(),
        );
        let expected = "m/44'/60'/0'/0/2\n\
                        ├── m: master key\n\
                        ├── 44': BIP44 purpose\n\
                        ├── 60': Ethereum coin type\n\
                        ├── 0': account index\n\
                        ├── 0: change (0 for receiving)\n\
                        └── 2: address index";
        assert_eq!(path.explain(), expected);
    }
}
