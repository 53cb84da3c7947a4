use crate::address::ScriptVariant;
use crate::bip32::Network;
use crate::error::Error;
use serde::Deserialize;

/// Initial parameters for a derivation session
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Network used for extended-key versions and Bitcoin address prefixes
    pub network: Network,
    /// Optional BIP-39 passphrase ("25th word")
    pub passphrase: String,
    pub address_index: u32,
    /// Only meaningful for Bitcoin sessions
    pub script_variant: ScriptVariant,
}

impl SessionConfig {
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    pub fn with_address_index(mut self, index: u32) -> Self {
        self.address_index = index;
        self
    }

    pub fn with_script_variant(mut self, variant: ScriptVariant) -> Self {
        self.script_variant = variant;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json)
            .map_err(|e| Error::UnsupportedParameter(format!("invalid session config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.network, Network::Bitcoin);
        assert_eq!(config.passphrase, "");
        assert_eq!(config.address_index, 0);
        assert_eq!(config.script_variant, ScriptVariant::Legacy);
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config =
            SessionConfig::from_json(r#"{"network":"testnet","script_variant":"native-segwit"}"#)
                .unwrap();
        assert_eq!(
            config,
            SessionConfig::default()
                .with_network(Network::Testnet)
                .with_script_variant(ScriptVariant::NativeSegwit)
        );

        assert!(SessionConfig::from_json(r#"{"network":"regtest"}"#).is_err());
    }
}
