//! Random Codes
//!
//! Short codes meant to be read aloud or typed by a person.

use rand::Rng;

/// Uppercase letters and digits without look-alikes (0/O, 1/I/L)
pub const READABLE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate `len` characters drawn uniformly from `alphabet`
pub fn random_code(alphabet: &[u8], len: usize) -> String {
    debug_assert!(!alphabet.is_empty());
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect()
}
