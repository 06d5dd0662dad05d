//! Session and CSRF token authorities.
//!
//! Both mint opaque 32-letter ids and keep them in their own token store
//! namespace. Sessions map id -> login and live 24 hours; CSRF tokens map
//! id -> id and live 3 hours.

mod csrf;
mod session;

use rand::Rng;

pub use csrf::{CSRF_TTL, CsrfAuthority};
pub use session::{SESSION_TTL, Session, SessionAuthority};

/// Length of every generated token id.
pub const TOKEN_LEN: usize = 32;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a random token id. Uniqueness is probabilistic only.
pub fn generate_token_id() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
