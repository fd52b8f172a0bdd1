// src/utils/code.rs

use rand::Rng;

/// Alphabet for verification codes. Uppercase + digits keeps codes easy to
/// read back over the phone or type from a printed certificate.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random verification code of `len` characters.
///
/// 36^12 possible codes at the default length makes brute-force guessing
/// infeasible; global uniqueness is still enforced by the database constraint,
/// with the caller regenerating on a collision.
pub fn generate_verification_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}
