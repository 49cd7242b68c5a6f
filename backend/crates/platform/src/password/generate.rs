//! Random Password Material

use rand::{rngs::OsRng, seq::SliceRandom};

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SPECIAL: &str = ",.;:+=&%#@£$/?*";

/// Alphabet for generated passwords needing `min_classes` classes
///
/// Lowercase always; uppercase from 2 classes, digits from 3 and
/// punctuation from 4.
pub fn policy_charset(min_classes: usize) -> String {
    let mut charset = String::from(LOWER);
    if min_classes > 1 {
        charset.push_str(UPPER);
    }
    if min_classes > 2 {
        charset.push_str(DIGITS);
    }
    if min_classes > 3 {
        charset.push_str(SPECIAL);
    }
    charset
}

/// `count` characters drawn uniformly from `charset` using the OS RNG
pub fn random_ascii(count: usize, charset: &str) -> String {
    let alphabet: Vec<char> = charset.chars().collect();
    (0..count)
        .filter_map(|_| alphabet.choose(&mut OsRng).copied())
        .collect()
}
