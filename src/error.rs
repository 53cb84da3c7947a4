use crate::step::StepKind;
use thiserror::Error;

/// Error types for the derivation explorer
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("Invalid extended key: {0}")]
    InvalidExtendedKey(String),

    #[error("Invalid checksum")]
    InvalidChecksum,

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid entropy: {0}")]
    InvalidEntropy(String),

    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),

    #[error("Base58 decoding error: {0}")]
    Base58DecodeError(String),

    #[error("Hardened derivation requires a private key")]
    PublicDerivationUnavailable,

    #[error("Word not found in wordlist: {0}")]
    UnknownWord(String),

    #[error("Address encoding failed: {0}")]
    AddressEncoding(String),

    #[error("Step '{step}' failed: {source}")]
    Step {
        step: StepKind,
        #[source]
        source: Box<Error>,
    },

    #[error("All steps of the session have already run")]
    SessionFinished,

    #[error("Session is not complete: {0}")]
    SessionIncomplete(String),

    #[error("Unsupported parameter: {0}")]
    UnsupportedParameter(String),
}

impl Error {
    /// Wrap an error raised while executing `step`
    pub(crate) fn in_step(step: StepKind, source: Error) -> Self {
        Error::Step {
            step,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through step wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
