//! Preview card generation.
//!
//! A classic password card is a symbol header followed by rows of random
//! characters. The user picks a column by symbol and a row by number and reads
//! their password off the grid, so the grid itself is the secret.

use rand::Rng;
use rand::distr::Alphanumeric;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::ServiceError;

pub const CARD_COLUMNS: usize = 29;
pub const CARD_ROWS: usize = 8;
pub const PASSPHRASE_LEN: usize = 20;

const HEADER_SYMBOLS: [char; CARD_COLUMNS] = [
    '■', '□', '▲', '△', '○', '●', '★', '☂', '☀', '☁', '☹', '☺', '♠', '♣', '♥', '♦', '♫', '€',
    '¥', '£', '$', '!', '?', '¡', '¿', '⊙', '◐', '◩', '✓',
];
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const SYMBOLS: &[u8] = b"@#$%&*<>?+=/\\";
const DIGITS: &[u8] = b"0123456789";

/// Knobs accepted by `/cards/new`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CardOptions {
    pub include_symbols: bool,
    /// Fill the lower half of the grid with digits only.
    pub digits_area: bool,
}

/// An unencrypted card and the passphrase proposed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCard {
    pub data: String,
    pub passphrase: String,
}

/// Produces preview cards. Nothing generated here is stored.
pub trait CardGenerator: Send + Sync {
    fn generate(&self, options: &CardOptions) -> Result<GeneratedCard, ServiceError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicCardGenerator;

impl CardGenerator for ClassicCardGenerator {
    fn generate(&self, options: &CardOptions) -> Result<GeneratedCard, ServiceError> {
        let mut rng = rand::rng();

        let mut header = HEADER_SYMBOLS;
        header.shuffle(&mut rng);

        let mut alphabet = ALPHANUMERIC.to_vec();
        if options.include_symbols {
            alphabet.extend_from_slice(SYMBOLS);
        }

        let mut lines = Vec::with_capacity(CARD_ROWS + 1);
        lines.push(header.iter().collect::<String>());
        for row in 0..CARD_ROWS {
            let pool: &[u8] = if options.digits_area && row >= CARD_ROWS / 2 {
                DIGITS
            } else {
                &alphabet
            };
            let line: String = (0..CARD_COLUMNS)
                .map(|_| char::from(pool[rng.random_range(0..pool.len())]))
                .collect();
            lines.push(line);
        }

        let passphrase: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(PASSPHRASE_LEN)
            .map(char::from)
            .collect();

        Ok(GeneratedCard {
            data: lines.join("\n"),
            passphrase,
        })
    }
}
