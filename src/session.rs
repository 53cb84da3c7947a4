use crate::address::{AddressInfo, AddressKind, ScriptVariant};
use crate::bip32::ExtendedKey;
use crate::bip44::{AddressIndex, Bip44Path};
use crate::config::SessionConfig;
use crate::entropy::{EntropySource, OsEntropy};
use crate::error::Error;
use crate::mnemonic::{Checksum, Mnemonic};
use crate::step::{Param, StepKind, StepOutput, StepRecord, BITCOIN_EXPLORE, ETHEREUM_CREATE};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    /// Stepped creation of a new Ethereum wallet
    EthereumCreate,
    /// One-shot import of an existing mnemonic, no steps
    EthereumImport,
    /// Stepped derivation of Bitcoin addresses of every script variant
    BitcoinExplore,
}

impl SessionKind {
    pub fn steps(&self) -> &'static [StepKind] {
        match self {
            SessionKind::EthereumCreate => &ETHEREUM_CREATE,
            SessionKind::EthereumImport => &[],
            SessionKind::BitcoinExplore => &BITCOIN_EXPLORE,
        }
    }

    pub fn is_ethereum(&self) -> bool {
        matches!(
            self,
            SessionKind::EthereumCreate | SessionKind::EthereumImport
        )
    }
}

/// What a finished Ethereum session hands to the wallet layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletDetails {
    pub address: String,
    pub private_key_hex: String,
    pub public_key_hex: String,
    pub mnemonic: Option<String>,
    pub derivation_path: String,
}

impl WalletDetails {
    fn new(
        address: String,
        key: &ExtendedKey,
        path: &Bip44Path,
        mnemonic: Option<&Mnemonic>,
    ) -> Result<Self, Error> {
        let private_key_hex = key
            .private_key_hex()
            .ok_or_else(|| Error::InvalidKey("derived node carries no private key".to_string()))?;
        Ok(WalletDetails {
            address,
            private_key_hex,
            public_key_hex: key.public_key_hex(),
            mnemonic: mnemonic.map(Mnemonic::phrase),
            derivation_path: path.to_string(),
        })
    }
}

pub struct Session {
    kind: SessionKind,
    config: SessionConfig,
    entropy_source: Box<dyn EntropySource>,
    initial_index: AddressIndex,
    address_index: AddressIndex,
    script_variant: ScriptVariant,
    cursor: usize,
    memo: Vec<Option<StepOutput>>,
    imported: Option<Mnemonic>,
}

/// Start a session drawing entropy from the operating system
pub fn start_session(kind: SessionKind, config: SessionConfig) -> Result<Session, Error> {
    Session::new(kind, config)
}

impl Session {
    pub fn new(kind: SessionKind, config: SessionConfig) -> Result<Self, Error> {
        Session::with_entropy_source(kind, config, Box::new(OsEntropy))
    }

    pub fn with_entropy_source(
        kind: SessionKind,
        config: SessionConfig,
        entropy_source: Box<dyn EntropySource>,
    ) -> Result<Self, Error> {
        let initial_index = AddressIndex::new(config.address_index)?;
        Ok(Session {
            kind,
            entropy_source,
            initial_index,
            address_index: initial_index,
            script_variant: config.script_variant,
            cursor: 0,
            memo: vec![None; kind.steps().len()],
            imported: None,
            config,
        })
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Index of the next step to execute
    pub fn current_step_index(&self) -> usize {
        self.cursor
    }

    pub fn step_count(&self) -> usize {
        self.kind.steps().len()
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.step_count()
    }

    pub fn address_index(&self) -> u32 {
        self.address_index.value()
    }

    pub fn script_variant(&self) -> ScriptVariant {
        self.script_variant
    }

    fn address_kind(&self) -> AddressKind {
        if self.kind.is_ethereum() {
            AddressKind::Ethereum
        } else {
            AddressKind::Bitcoin(self.script_variant)
        }
    }

    /// Rendered payload of step `index`, if it has run
    pub fn memo(&self, index: usize) -> Option<String> {
        self.output(index).map(|output| output.to_string())
    }

    /// Typed payload of step `index`, if it has run
    pub fn output(&self, index: usize) -> Option<&StepOutput> {
        self.memo.get(index).and_then(Option::as_ref)
    }

    pub fn record(&self, index: usize) -> Option<StepRecord> {
        self.kind.steps().get(index).map(|kind| StepRecord {
            index,
            kind: *kind,
            title: kind.title(),
            description: kind.description(),
            payload: self.memo(index),
        })
    }

    /// Every step of the plan, executed or not
    pub fn records(&self) -> Vec<StepRecord> {
        (0..self.step_count())
            .filter_map(|i| self.record(i))
            .collect()
    }

    /// Execute the step at the cursor. On failure the cursor and the memo are
    /// left untouched so the same step can be retried.
    pub fn advance(&mut self) -> Result<StepRecord, Error> {
        let index = self.cursor;
        let kind = *self
            .kind
            .steps()
            .get(index)
            .ok_or(Error::SessionFinished)?;

        let result = match kind {
            StepKind::GenerateEntropy => self.entropy_source.generate().map(|bytes| {
                StepOutput::Entropy {
                    bytes: bytes.to_vec(),
                }
            }),
            _ => self.compute(kind, &self.memo),
        };

        match result {
            Ok(output) => {
                debug!(step = %kind, index, "step executed");
                self.memo[index] = Some(output);
                self.cursor += 1;
                self.record(index).ok_or(Error::SessionFinished)
            }
            Err(e) => {
                warn!(step = %kind, index, error = %e, "step failed, cursor kept");
                Err(Error::in_step(kind, e))
            }
        }
    }

    /// Run every remaining step
    pub fn run_to_end(&mut self) -> Result<(), Error> {
        while !self.is_complete() {
            self.advance()?;
        }
        Ok(())
    }

    pub fn set_address_index(&mut self, index: u32) -> Result<(), Error> {
        let index = AddressIndex::new(index)?;
        if index == self.address_index {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.address_index, index);
        self.recompute(Param::AddressIndex).inspect_err(|_| {
            self.address_index = previous;
        })
    }

    pub fn set_script_variant(&mut self, variant: ScriptVariant) -> Result<(), Error> {
        if self.kind != SessionKind::BitcoinExplore {
            return Err(Error::UnsupportedParameter(
                "script variants only apply to Bitcoin sessions".to_string(),
            ));
        }
        if variant == self.script_variant {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.script_variant, variant);
        self.recompute(Param::ScriptVariant).inspect_err(|_| {
            self.script_variant = previous;
        })
    }

    /// Back to the initial state: no executed steps, no mnemonic, initial parameters
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.memo = vec![None; self.step_count()];
        self.imported = None;
        self.address_index = self.initial_index;
        self.script_variant = self.config.script_variant;
        debug!(kind = ?self.kind, "session reset");
    }

    /// Validate a user-supplied mnemonic and derive the wallet in one go
    pub fn import(&mut self, phrase: &str) -> Result<WalletDetails, Error> {
        if self.kind != SessionKind::EthereumImport {
            return Err(Error::UnsupportedParameter(
                "import is only available in Ethereum import sessions".to_string(),
            ));
        }
        let mnemonic = Mnemonic::from_phrase(phrase)?;
        let details = self.ethereum_wallet(&mnemonic)?;
        info!(address = %details.address, path = %details.derivation_path, "wallet imported");
        self.imported = Some(mnemonic);
        Ok(details)
    }

    /// The wallet produced by a finished Ethereum session, at the current index
    pub fn finalize(&self) -> Result<WalletDetails, Error> {
        match self.kind {
            SessionKind::EthereumCreate => match self.memo.last() {
                Some(Some(StepOutput::Complete(details))) => Ok(details.clone()),
                _ => Err(Error::SessionIncomplete(format!(
                    "{} of {} steps executed",
                    self.cursor,
                    self.step_count()
                ))),
            },
            SessionKind::EthereumImport => {
                let mnemonic = self.imported.as_ref().ok_or_else(|| {
                    Error::SessionIncomplete("no mnemonic imported".to_string())
                })?;
                self.ethereum_wallet(mnemonic)
            }
            SessionKind::BitcoinExplore => Err(Error::UnsupportedParameter(
                "finalize is only available for Ethereum sessions".to_string(),
            )),
        }
    }

    fn ethereum_wallet(&self, mnemonic: &Mnemonic) -> Result<WalletDetails, Error> {
        let seed = mnemonic.to_seed(&self.config.passphrase);
        let path = AddressKind::Ethereum.path(self.address_index);
        let key = ExtendedKey::new_master(seed.as_bytes(), self.config.network)?
            .derive_path(&path.to_derivation_path())?;
        let address = AddressKind::Ethereum.encode(&key.public_key, self.config.network)?;
        WalletDetails::new(address, &key, &path, Some(mnemonic))
    }

    /// Re-run every executed step reachable from `changed` in the dependency
    /// graph. Results are committed only if all of them succeed.
    fn recompute(&mut self, changed: Param) -> Result<(), Error> {
        let mut scratch = self.memo.clone();
        let mut dirty: Vec<StepKind> = Vec::new();

        for (i, &kind) in self.kind.steps().iter().enumerate().take(self.cursor) {
            let affected = kind.depends_on_param(changed)
                || dirty.iter().any(|upstream| kind.depends_on_step(*upstream));
            if !affected {
                continue;
            }
            let output = self
                .compute(kind, &scratch)
                .map_err(|e| Error::in_step(kind, e))?;
            scratch[i] = Some(output);
            dirty.push(kind);
        }

        if !dirty.is_empty() {
            info!(param = ?changed, steps = ?dirty, "recomputed dependent steps");
        }
        self.memo = scratch;
        Ok(())
    }

    fn upstream<'a>(
        &self,
        memo: &'a [Option<StepOutput>],
        kind: StepKind,
    ) -> Result<&'a StepOutput, Error> {
        self.kind
            .steps()
            .iter()
            .position(|step| *step == kind)
            .and_then(|i| memo[i].as_ref())
            .ok_or_else(|| Error::SessionIncomplete(format!("step '{}' has not run", kind)))
    }

    fn extract<'a, T>(
        &self,
        memo: &'a [Option<StepOutput>],
        kind: StepKind,
        pick: impl FnOnce(&'a StepOutput) -> Option<T>,
    ) -> Result<T, Error> {
        pick(self.upstream(memo, kind)?).ok_or_else(|| {
            Error::SessionIncomplete(format!("step '{}' holds an unexpected payload", kind))
        })
    }

    /// Compute the output of `kind` from upstream memo entries and the
    /// current parameters
    fn compute(&self, kind: StepKind, memo: &[Option<StepOutput>]) -> Result<StepOutput, Error> {
        let network = self.config.network;
        let output = match kind {
            StepKind::GenerateEntropy => self.upstream(memo, kind)?.clone(),
            StepKind::ComputeChecksum => {
                let entropy = self.extract(memo, StepKind::GenerateEntropy, |o| match o {
                    StepOutput::Entropy { bytes } => Some(bytes),
                    _ => None,
                })?;
                StepOutput::Checksum(Checksum::of(entropy)?)
            }
            StepKind::EncodeMnemonic => {
                let entropy = self.extract(memo, StepKind::GenerateEntropy, |o| match o {
                    StepOutput::Entropy { bytes } => Some(bytes),
                    _ => None,
                })?;
                let mnemonic = Mnemonic::from_entropy(entropy)?;
                let words = mnemonic.annotate();
                StepOutput::Mnemonic { mnemonic, words }
            }
            StepKind::DeriveSeed => {
                let mnemonic = self.mnemonic_of(memo)?;
                StepOutput::Seed(mnemonic.to_seed(&self.config.passphrase))
            }
            StepKind::DerivePrivateKey => {
                let seed = self.extract(memo, StepKind::DeriveSeed, |o| match o {
                    StepOutput::Seed(seed) => Some(seed),
                    _ => None,
                })?;
                let path = AddressKind::Ethereum.path(self.address_index);
                let key = ExtendedKey::new_master(seed.as_bytes(), network)?
                    .derive_path(&path.to_derivation_path())?;
                StepOutput::PrivateKey { path, key }
            }
            StepKind::DerivePublicKey => {
                let (_, key) = self.private_key_of(memo)?;
                StepOutput::PublicKey(key.public_key)
            }
            StepKind::DeriveAddress => {
                let public_key = self.extract(memo, StepKind::DerivePublicKey, |o| match o {
                    StepOutput::PublicKey(pk) => Some(pk),
                    _ => None,
                })?;
                StepOutput::EthereumAddress(AddressKind::Ethereum.encode(public_key, network)?)
            }
            StepKind::Complete => {
                let mnemonic = self.mnemonic_of(memo)?;
                let (path, key) = self.private_key_of(memo)?;
                let address = self.extract(memo, StepKind::DeriveAddress, |o| match o {
                    StepOutput::EthereumAddress(address) => Some(address.clone()),
                    _ => None,
                })?;
                StepOutput::Complete(WalletDetails::new(address, key, path, Some(mnemonic))?)
            }
            StepKind::DeriveMasterKeys => {
                let seed = self.extract(memo, StepKind::DeriveSeed, |o| match o {
                    StepOutput::Seed(seed) => Some(seed),
                    _ => None,
                })?;
                StepOutput::MasterKeys(ExtendedKey::new_master(seed.as_bytes(), network)?)
            }
            StepKind::DeriveAccountKeys => {
                let master = self.extract(memo, StepKind::DeriveMasterKeys, |o| match o {
                    StepOutput::MasterKeys(key) => Some(key),
                    _ => None,
                })?;
                let path = self.address_kind().path(self.address_index).account_path();
                let key = master.derive_path(&path)?;
                StepOutput::AccountKeys { path, key }
            }
            StepKind::DeriveAddressKeys => {
                let account = self.extract(memo, StepKind::DeriveAccountKeys, |o| match o {
                    StepOutput::AccountKeys { key, .. } => Some(key),
                    _ => None,
                })?;
                let path = self.address_kind().path(self.address_index);
                let key = account.derive_path(&path.address_suffix())?;
                let addresses =
                    AddressInfo::all_variants(&key.public_key, self.address_index, network)?;
                StepOutput::AddressKeys {
                    path,
                    selected: self.script_variant,
                    key,
                    addresses,
                }
            }
        };
        Ok(output)
    }

    fn mnemonic_of<'a>(&self, memo: &'a [Option<StepOutput>]) -> Result<&'a Mnemonic, Error> {
        self.extract(memo, StepKind::EncodeMnemonic, |o| match o {
            StepOutput::Mnemonic { mnemonic, .. } => Some(mnemonic),
            _ => None,
        })
    }

    fn private_key_of<'a>(
        &self,
        memo: &'a [Option<StepOutput>],
    ) -> Result<(&'a Bip44Path, &'a ExtendedKey), Error> {
        self.extract(memo, StepKind::DerivePrivateKey, |o| match o {
            StepOutput::PrivateKey { path, key } => Some((path, key)),
            _ => None,
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("cursor", &self.cursor)
            .field("address_index", &self.address_index)
            .field("script_variant", &self.script_variant)
            .finish_non_exhaustive()
    }
}
