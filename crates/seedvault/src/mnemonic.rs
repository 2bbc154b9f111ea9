//! BIP-39 recovery phrases: generation, strict parsing, seed derivation.

use crate::errors::VaultError;
use bip39::{Language, Mnemonic};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use zeroize::Zeroizing;

/// Word counts offered for freshly generated phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum WordCount {
    /// 128 bits of entropy.
    #[default]
    Twelve,
    /// 256 bits of entropy.
    TwentyFour,
}

impl WordCount {
    pub const fn words(self) -> usize {
        match self {
            Self::Twelve => 12,
            Self::TwentyFour => 24,
        }
    }

    pub const fn entropy_bytes(self) -> usize {
        match self {
            Self::Twelve => 16,
            Self::TwentyFour => 32,
        }
    }
}

impl TryFrom<u8> for WordCount {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            12 => Ok(Self::Twelve),
            24 => Ok(Self::TwentyFour),
            other => Err(format!("unsupported word count {other} (expected 12 or 24)")),
        }
    }
}

impl From<WordCount> for u8 {
    fn from(w: WordCount) -> Self {
        match w {
            WordCount::Twelve => 12,
            WordCount::TwentyFour => 24,
        }
    }
}

impl FromStr for WordCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u8 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid word count {s:?}: {e}"))?;
        Self::try_from(n)
    }
}

impl fmt::Display for WordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words())
    }
}

/// Generate a fresh English phrase from OS randomness.
pub fn generate(words: WordCount) -> eyre::Result<Mnemonic> {
    let mut entropy = Zeroizing::new([0_u8; 32]);
    let Some(buf) = entropy.get_mut(..words.entropy_bytes()) else {
        eyre::bail!("entropy buffer too small");
    };
    crate::keystore::crypto::fill_random(buf);
    Mnemonic::from_entropy_in(Language::English, buf)
        .map_err(|e| eyre::eyre!("generate mnemonic: {e}"))
}

/// Parse user input. Surrounding/inner whitespace and letter case are normalized first.
pub fn parse(phrase: &str) -> Result<Mnemonic, VaultError> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" "),
    );
    if normalized.is_empty() {
        return Err(VaultError::InvalidMnemonic("empty phrase".to_owned()));
    }
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| VaultError::InvalidMnemonic(e.to_string()))
}

/// 64-byte BIP-39 seed (empty passphrase).
pub fn seed(mnemonic: &Mnemonic) -> Zeroizing<[u8; 64]> {
    Zeroizing::new(mnemonic.to_seed_normalized(""))
}

pub fn word_count(mnemonic: &Mnemonic) -> u8 {
    u8::try_from(mnemonic.word_count()).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon about";

    #[test]
    fn generated_phrases_have_requested_length() -> eyre::Result<()> {
        assert_eq!(generate(WordCount::Twelve)?.word_count(), 12);
        assert_eq!(generate(WordCount::TwentyFour)?.word_count(), 24);
        Ok(())
    }

    #[test]
    fn parse_normalizes_whitespace_and_case() -> eyre::Result<()> {
        let messy = format!("  {}  ", ABANDON.replace(' ', "\n  ").to_uppercase());
        let m = parse(&messy)?;
        assert_eq!(m.to_string(), ABANDON);
        Ok(())
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let bad = ABANDON.replace("about", "abandon");
        let err = parse(&bad).err();
        assert!(matches!(err, Some(VaultError::InvalidMnemonic(_))));
    }

    #[test]
    fn unknown_words_and_empty_input_are_rejected() {
        assert!(parse("").is_err());
        assert!(parse(&ABANDON.replace("about", "zzzz")).is_err());
    }

    #[test]
    fn seed_matches_bip39_reference_vector() -> eyre::Result<()> {
        // Reference seed for the all-"abandon ... about" phrase with an empty passphrase.
        let m = parse(ABANDON)?;
        let s = seed(&m);
        assert_eq!(
            hex::encode(s.as_slice()),
            concat!(
                "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1",
                "9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
            )
        );
        Ok(())
    }

    #[test]
    fn import_accepts_every_bip39_length() -> eyre::Result<()> {
        let m = Mnemonic::from_entropy_in(Language::English, &[0_u8; 20])?;
        assert_eq!(word_count(&parse(&m.to_string())?), 15);
        Ok(())
    }

    #[test]
    fn word_count_parses_from_text() {
        assert_eq!("24".parse::<WordCount>().ok(), Some(WordCount::TwentyFour));
        assert!("18".parse::<WordCount>().is_err());
    }
}
