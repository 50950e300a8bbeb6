//! Account password hashing and strength estimation.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::error::ServiceError;

/// Minimum estimated entropy, in bits, for a password to be accepted.
pub const MIN_PASSWORD_ENTROPY: f64 = 60.0;

/// Hash a password with Argon2id. Returns a PHC string carrying salt and params.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(ServiceError::internal)
}

/// Check `password` against a stored PHC hash.
///
/// A malformed stored hash is a server fault, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(ServiceError::internal)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

const REPLACE_CHARS: &str = "!@$&*";
const SEP_CHARS: &str = "_-., ";
const OTHER_SPECIAL_CHARS: &str = "\"#%'()+/:;<=>?[\\]^{|}~";

/// Keyboard rows and alphabetic runs; only the first two characters of a
/// consecutive run along one of these count towards the length.
const SEQUENCES: [&str; 5] = [
    "0123456789",
    "qwertyuiop",
    "asdfghjkl",
    "zxcvbnm",
    "abcdefghijklmnopqrstuvwxyz",
];

/// Brute-force entropy: `effective_length * log2(base)`, following the rules
/// of go-password-validator.
///
/// The base sums the sizes of the character sets present (replace `!@$&*`,
/// separators `_-., `, other specials, lower, upper, digits), plus one for
/// each distinct character outside them. The effective length drops
/// everything past the second character of a run along [`SEQUENCES`] or of a
/// run of identical characters. Unlike that library, length is counted in
/// characters rather than UTF-8 bytes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn password_entropy(password: &str) -> f64 {
    let base = entropy_base(password);
    if base == 0 {
        return 0.0;
    }
    effective_length(password) as f64 * f64::from(base).log2()
}

fn entropy_base(password: &str) -> u32 {
    let sets: [(&dyn Fn(char) -> bool, u32); 6] = [
        (&|c| REPLACE_CHARS.contains(c), 5),
        (&|c| SEP_CHARS.contains(c), 5),
        (&|c| OTHER_SPECIAL_CHARS.contains(c), 22),
        (&|c: char| c.is_ascii_lowercase(), 26),
        (&|c: char| c.is_ascii_uppercase(), 26),
        (&|c: char| c.is_ascii_digit(), 10),
    ];

    let known: u32 = sets
        .iter()
        .filter(|(member, _)| password.chars().any(member))
        .map(|(_, size)| size)
        .sum();
    let mut others: Vec<char> = password
        .chars()
        .filter(|&c| !sets.iter().any(|(member, _)| member(c)))
        .collect();
    others.sort_unstable();
    others.dedup();

    known.saturating_add(u32::try_from(others.len()).unwrap_or(u32::MAX))
}

fn effective_length(password: &str) -> usize {
    let mut chars: Vec<char> = password.chars().collect();
    for sequence in SEQUENCES {
        chars = drop_sequence_runs(&chars, sequence);
    }
    drop_repeat_runs(&chars).len()
}

fn drop_sequence_runs(chars: &[char], sequence: &str) -> Vec<char> {
    let position = |c: char| sequence.chars().position(|s| s == c);
    let mut kept = Vec::with_capacity(chars.len());
    let mut previous: Option<usize> = None;
    let mut run = 0usize;

    for &c in chars {
        let current = position(c);
        run = match (previous, current) {
            (Some(p), Some(n)) if n == p + 1 => run + 1,
            (_, Some(_)) => 1,
            _ => 0,
        };
        previous = current;
        if run <= 2 {
            kept.push(c);
        }
    }
    kept
}

fn drop_repeat_runs(chars: &[char]) -> Vec<char> {
    let mut kept = Vec::with_capacity(chars.len());
    let mut previous = None;
    let mut run = 0usize;
    for &c in chars {
        if previous == Some(c) {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run <= 2 {
            kept.push(c);
        }
    }
    kept
}

#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password_entropy(password) >= MIN_PASSWORD_ENTROPY
}
