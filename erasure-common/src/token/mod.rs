use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64_urlsafe;
use base64::Engine;
use std::fmt;

use crate::threadrand::SecureRng;

/// Number of random bytes behind every deletion request token.
pub const TOKEN_BYTES: usize = 32;

/// Longest string accepted as a token. Anything longer was not issued by us.
pub const MAX_TOKEN_LENGTH: usize = 128;

#[derive(Debug)]
pub enum TokenError {
    TokenMissing,
    TokenInvalid,
}

impl std::error::Error for TokenError {}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::TokenMissing => write!(f, "TokenError: Token is missing"),
            TokenError::TokenInvalid => write!(f, "TokenError: Token is invalid"),
        }
    }
}

/// Source of unguessable identifiers for new deletion requests.
pub trait GenerateToken: Send + Sync {
    fn generate(&self) -> String;
}

/// Produces 256-bit tokens from the thread-local secure RNG, encoded as unpadded
/// URL-safe base64 so they can be used verbatim in links and file names.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokenGenerator;

impl GenerateToken for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        SecureRng::fill(&mut bytes);
        b64_urlsafe.encode(bytes)
    }
}

/// Checks that `token` only uses the URL-safe base64 alphabet and is not absurdly long.
pub fn is_well_formed(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LENGTH
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Rejects missing or malformed tokens taken from a request.
pub fn parse(token: Option<&str>) -> Result<&str, TokenError> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Err(TokenError::TokenMissing),
    };

    if !is_well_formed(token) {
        return Err(TokenError::TokenInvalid);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn test_generated_tokens_are_well_formed_and_unique() {
        let generator = RandomTokenGenerator;
        let mut seen = HashSet::new();

        for _ in 0..1000 {
            let token = generator.generate();
            assert_eq!(token.len(), 43);
            assert!(is_well_formed(&token));
            assert!(seen.insert(token));
        }
    }

    #[test]
    fn test_is_well_formed() {
        assert!(is_well_formed("abcXYZ019-_"));
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("../etc/passwd"));
        assert!(!is_well_formed("with space"));
        assert!(!is_well_formed("dot.json"));
        assert!(!is_well_formed(&"a".repeat(MAX_TOKEN_LENGTH + 1)));
        assert!(is_well_formed(&"a".repeat(MAX_TOKEN_LENGTH)));
    }

    #[test]
    fn test_parse() {
        assert!(matches!(parse(None), Err(TokenError::TokenMissing)));
        assert!(matches!(parse(Some("")), Err(TokenError::TokenMissing)));
        assert!(matches!(parse(Some("a/b")), Err(TokenError::TokenInvalid)));
        assert_eq!(parse(Some("abc")).unwrap(), "abc");
    }
}
