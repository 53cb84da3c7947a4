use crate::error::Error;
use crate::utils;
use bip39::Language;
use pbkdf2::pbkdf2_hmac;
use serde::Serialize;
use sha2::Sha512;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Number of entries in a BIP-39 wordlist
pub const WORDLIST_SIZE: usize = 2048;

/// Bits encoded by a single word
pub const BITS_PER_WORD: usize = 11;

/// PBKDF2 iteration count for seed derivation
pub const PBKDF2_ROUNDS: u32 = 2048;

/// Supported mnemonic lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Words12,
    Words15,
    Words18,
    Words21,
    Words24,
}

impl WordCount {
    pub fn from_word_count(count: usize) -> Option<Self> {
        match count {
            12 => Some(WordCount::Words12),
            15 => Some(WordCount::Words15),
            18 => Some(WordCount::Words18),
            21 => Some(WordCount::Words21),
            24 => Some(WordCount::Words24),
            _ => None,
        }
    }

    pub fn from_entropy_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(WordCount::Words12),
            20 => Some(WordCount::Words15),
            24 => Some(WordCount::Words18),
            28 => Some(WordCount::Words21),
            32 => Some(WordCount::Words24),
            _ => None,
        }
    }

    pub fn word_count(&self) -> usize {
        match self {
            WordCount::Words12 => 12,
            WordCount::Words15 => 15,
            WordCount::Words18 => 18,
            WordCount::Words21 => 21,
            WordCount::Words24 => 24,
        }
    }

    pub fn entropy_bits(&self) -> usize {
        self.word_count() * BITS_PER_WORD * 32 / 33
    }

    pub fn checksum_bits(&self) -> usize {
        self.entropy_bits() / 32
    }
}

/// SHA-256 of the entropy and the leading bits kept as checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    pub hash: [u8; 32],
    pub bits: usize,
}

impl Checksum {
    /// Checksum of entropy whose length is one of the supported word counts
    pub fn of(entropy: &[u8]) -> Result<Self, Error> {
        let count = WordCount::from_entropy_len(entropy.len()).ok_or_else(|| {
            Error::InvalidEntropy(format!("unsupported entropy length {}", entropy.len()))
        })?;
        Ok(Checksum {
            hash: utils::sha256(entropy),
            bits: count.checksum_bits(),
        })
    }

    /// First byte of the hash, of which the top `bits` bits are used
    pub fn byte(&self) -> u8 {
        self.hash[0]
    }

    /// The checksum bits, right-aligned
    pub fn value(&self) -> u8 {
        self.hash[0] >> (8 - self.bits)
    }
}

/// Position of `word` in the English wordlist
pub fn word_index(word: &str) -> Result<u16, Error> {
    Language::English
        .find_word(word)
        .ok_or_else(|| Error::UnknownWord(word.to_string()))
}

fn read_bits(buf: &[u8], offset: usize, len: usize) -> usize {
    (offset..offset + len).fold(0usize, |acc, bit| {
        let set = buf[bit / 8] & (0x80 >> (bit % 8)) != 0;
        (acc << 1) | set as usize
    })
}

fn write_bits(buf: &mut [u8], offset: usize, len: usize, value: usize) {
    for i in 0..len {
        if value & (1 << (len - 1 - i)) != 0 {
            let bit = offset + i;
            buf[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
}

/// A validated BIP-39 mnemonic together with the entropy it encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mnemonic {
    words: Vec<&'static str>,
    entropy: Vec<u8>,
}

impl Mnemonic {
    /// Encode entropy (16, 20, 24, 28 or 32 bytes) as a mnemonic
    pub fn from_entropy(entropy: &[u8]) -> Result<Self, Error> {
        let count = WordCount::from_entropy_len(entropy.len()).ok_or_else(|| {
            Error::InvalidEntropy(format!("unsupported entropy length {}", entropy.len()))
        })?;

        let checksum = Checksum::of(entropy)?;
        let mut bits = Vec::with_capacity(entropy.len() + 1);
        bits.extend_from_slice(entropy);
        bits.push(checksum.byte());

        let list = Language::English.word_list();
        let words = (0..count.word_count())
            .map(|i| list[read_bits(&bits, i * BITS_PER_WORD, BITS_PER_WORD)])
            .collect();

        Ok(Mnemonic {
            words,
            entropy: entropy.to_vec(),
        })
    }

    /// Parse and fully validate a phrase (word count, membership, checksum)
    pub fn from_phrase(phrase: &str) -> Result<Self, Error> {
        let normalized: String = phrase.nfkd().collect();
        let words: Vec<&str> = normalized.split_whitespace().collect();

        let count = WordCount::from_word_count(words.len()).ok_or_else(|| {
            Error::InvalidMnemonic(format!("invalid word count {}", words.len()))
        })?;

        let mut bits = vec![0u8; (count.word_count() * BITS_PER_WORD + 7) / 8];
        let list = Language::English.word_list();
        let mut resolved = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let index = word_index(word).map_err(|_| {
                Error::InvalidMnemonic(format!("word {} ({}) is not in the wordlist", i + 1, word))
            })?;
            write_bits(&mut bits, i * BITS_PER_WORD, BITS_PER_WORD, index as usize);
            resolved.push(list[index as usize]);
        }

        let entropy = bits[..count.entropy_bits() / 8].to_vec();
        let stored = read_bits(&bits, count.entropy_bits(), count.checksum_bits());
        if stored != Checksum::of(&entropy)?.value() as usize {
            return Err(Error::InvalidMnemonic("checksum mismatch".to_string()));
        }

        Ok(Mnemonic {
            words: resolved,
            entropy,
        })
    }

    pub fn words(&self) -> &[&'static str] {
        &self.words
    }

    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    pub fn entropy(&self) -> &[u8] {
        &self.entropy
    }

    pub fn checksum(&self) -> Checksum {
        // entropy length is validated on construction
        Checksum {
            hash: utils::sha256(&self.entropy),
            bits: self.entropy.len() * 8 / 32,
        }
    }

    /// Derive the 64-byte seed with an optional passphrase
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        derive_seed(&self.phrase(), passphrase)
    }

    /// Word-by-word index/binary breakdown
    pub fn annotate(&self) -> Vec<WordAnnotation> {
        self.words
            .iter()
            .enumerate()
            .map(|(i, word)| WordAnnotation::new(i + 1, word))
            .collect()
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.phrase())
    }
}

/// Validate a user-supplied phrase without keeping it
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::from_phrase(phrase).is_ok()
}

/// Didactic annotation of one mnemonic word. A lookup failure is kept here
/// rather than failing the step that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordAnnotation {
    pub position: usize,
    pub word: String,
    pub index: Option<u16>,
}

impl WordAnnotation {
    pub fn new(position: usize, word: &str) -> Self {
        let index = match word_index(word) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(position, error = %e, "cannot annotate mnemonic word");
                None
            }
        };
        WordAnnotation {
            position,
            word: word.to_string(),
            index,
        }
    }
}

impl fmt::Display for WordAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index {
            Some(index) => write!(
                f,
                "{}. {} ({:>4} = {:011b})",
                self.position, self.word, index, index
            ),
            None => write!(f, "{}. {} (not in wordlist)", self.position, self.word),
        }
    }
}

/// A 64-byte BIP-39 seed
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        utils::hex_prefixed(&self.0)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// PBKDF2-HMAC-SHA512 over the NFKD-normalised phrase, salt "mnemonic" + passphrase
pub fn derive_seed(phrase: &str, passphrase: &str) -> Seed {
    let password: String = phrase.nfkd().collect();
    let salt: String = format!("mnemonic{}", passphrase).nfkd().collect();
    let mut seed = [0u8; 64];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut seed);
    Seed(seed)
}
