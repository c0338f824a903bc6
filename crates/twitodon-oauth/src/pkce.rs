//! PKCE verifier and login session identifiers.

use rand::RngCore;

/// Twitter accepts the verifier itself as the challenge.
pub const CODE_CHALLENGE_METHOD: &str = "plain";

/// Random bytes per generated token (256 bits).
const TOKEN_BYTES: usize = 32;

/// PKCE code verifier and challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new verifier. With the `plain` method the challenge is the
    /// verifier unchanged.
    pub fn generate() -> Self {
        let verifier = random_hex();
        Self {
            challenge: verifier.clone(),
            verifier,
        }
    }
}

/// Generate a login session id, sent to the provider as `state`.
pub fn generate_session_id() -> String {
    random_hex()
}

fn random_hex() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Percent-encode `params` into a query string (spaces become `%20`).
pub fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
