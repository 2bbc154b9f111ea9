//! Wallet password policy.

use crate::{config::PasswordPolicy, errors::VaultError};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLabel {
    Weak,
    Medium,
    Strong,
}

impl StrengthLabel {
    pub const fn for_score(score: u8) -> Self {
        if score < 40 {
            Self::Weak
        } else if score < 70 {
            Self::Medium
        } else {
            Self::Strong
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// Heuristic score in `0..=100`. Character classes are ASCII; anything else counts as a symbol.
pub fn strength(password: &str) -> u8 {
    let len = password.chars().count();
    let mut score = 0_u8;
    if len >= 8 {
        score += 20;
    }
    if len >= 12 {
        score += 10;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 20;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 10;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 20;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 20;
    }
    score
}

/// Check a new password and its confirmation. Returns the strength score on success.
pub fn validate(
    password: &SecretString,
    confirm: &SecretString,
    policy: &PasswordPolicy,
) -> Result<u8, VaultError> {
    let p = password.expose_secret();
    if p.chars().count() < policy.min_length {
        return Err(VaultError::PasswordTooShort {
            min: policy.min_length,
        });
    }
    if p != confirm.expose_secret() {
        return Err(VaultError::PasswordMismatch);
    }
    let score = strength(p);
    if score < policy.min_strength {
        return Err(VaultError::PasswordTooWeak {
            score,
            min: policy.min_strength,
        });
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> SecretString {
        SecretString::new(v.to_owned().into())
    }

    #[test]
    fn scores_follow_character_classes() {
        assert_eq!(strength(""), 0);
        assert_eq!(strength("abcdefgh"), 30);
        assert_eq!(strength("abcdefgh1"), 50);
        assert_eq!(strength("Abcdefgh1"), 70);
        assert_eq!(strength("Abcdefgh1!xy"), 100);
        assert_eq!(strength("ÄÖÜ"), 20);
    }

    #[test]
    fn labels_match_thresholds() {
        assert_eq!(StrengthLabel::for_score(39), StrengthLabel::Weak);
        assert_eq!(StrengthLabel::for_score(40), StrengthLabel::Medium);
        assert_eq!(StrengthLabel::for_score(69), StrengthLabel::Medium);
        assert_eq!(StrengthLabel::for_score(70), StrengthLabel::Strong);
    }

    #[test]
    fn policy_checks_run_in_order() {
        let policy = PasswordPolicy::default();
        assert_eq!(
            validate(&s("Ab1!"), &s("Ab1!"), &policy),
            Err(VaultError::PasswordTooShort { min: 8 })
        );
        assert_eq!(
            validate(&s("Abcdefg1!"), &s("Abcdefg1?"), &policy),
            Err(VaultError::PasswordMismatch)
        );
        assert_eq!(
            validate(&s("abcdefgh"), &s("abcdefgh"), &policy),
            Err(VaultError::PasswordTooWeak { score: 30, min: 40 })
        );
        assert_eq!(validate(&s("abcdefgh1"), &s("abcdefgh1"), &policy), Ok(50));
    }
}
