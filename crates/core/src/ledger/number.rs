//! Transaction number generation.
//!
//! Numbers look like `TXN-1F0C2A9B44E7`: a configured prefix and 12
//! upper-case hex digits taken from a random UUID. Uniqueness is checked
//! against the store before insert, and the store's unique constraint backs
//! the check up.

use uuid::Uuid;

/// Length of the random part of a transaction number.
pub const NUMBER_SUFFIX_LEN: usize = 12;

/// Source of random number suffixes.
pub trait NumberSource: Send + Sync {
    /// Returns a fresh suffix of [`NUMBER_SUFFIX_LEN`] characters.
    fn next_suffix(&self) -> String;
}

/// Suffixes from UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNumberSource;

impl NumberSource for RandomNumberSource {
    fn next_suffix(&self) -> String {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(NUMBER_SUFFIX_LEN);
        hex.to_uppercase()
    }
}

/// Joins a prefix and a suffix.
#[must_use]
pub fn format_number(prefix: &str, suffix: &str) -> String {
    format!("{prefix}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_suffix_shape() {
        let suffix = RandomNumberSource.next_suffix();
        assert_eq!(suffix.len(), NUMBER_SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("TXN", "ABCDEF012345"), "TXN-ABCDEF012345");
    }
}
