//! Token codec for sale access tokens.
//!
//! A token is `base64url(sha256("{sale_id}/{salt}"))`. The salt never leaves the
//! server, so a client can only obtain a token for a sale by asking the admission
//! gate while the sale is open. Tokens carry no expiry; the window checks at
//! exposure and at stock decrement bound them in time.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::types::SaleId;

/// Access token for one sale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Token text as presented back by the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning its text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives and verifies sale access tokens from a server-side secret salt.
#[derive(Clone)]
pub struct TokenCodec {
    salt: String,
}

impl TokenCodec {
    /// Create a codec with the given secret salt.
    #[must_use]
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Derive the access token for `sale_id`.
    #[must_use]
    pub fn derive(&self, sale_id: SaleId) -> AccessToken {
        let digest = Sha256::digest(format!("{sale_id}/{}", self.salt).as_bytes());
        AccessToken(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Check `token` against the token derived for `sale_id`.
    ///
    /// Returns `false` for an empty token or any mismatch. The comparison runs in
    /// constant time.
    #[must_use]
    pub fn verify(&self, sale_id: SaleId, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let expected = self.derive(sale_id);
        constant_time_eq::constant_time_eq(expected.as_str().as_bytes(), token.as_bytes())
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("salt", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("asfasdfhas8er7fdyhfa")
    }

    #[test]
    fn derived_token_verifies() {
        let codec = codec();
        let token = codec.derive(SaleId::new(1000));
        assert!(codec.verify(SaleId::new(1000), token.as_str()));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(!codec().verify(SaleId::new(1000), ""));
    }

    #[test]
    fn token_is_url_safe() {
        let token = codec().derive(SaleId::new(1000));
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn different_salt_yields_different_token() {
        let a = TokenCodec::new("salt-a").derive(SaleId::new(1));
        let b = TokenCodec::new("salt-b").derive(SaleId::new(1));
        assert_ne!(a, b);
    }

    #[test]
    fn debug_output_hides_salt() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains("asfasdfhas8er7fdyhfa"));
    }

    proptest! {
        #[test]
        fn token_for_other_sale_is_rejected(id in any::<i64>(), other in any::<i64>()) {
            prop_assume!(id != other);
            let codec = codec();
            let token = codec.derive(SaleId::new(other));
            prop_assert!(!codec.verify(SaleId::new(id), token.as_str()));
        }

        #[test]
        fn derivation_is_deterministic(id in any::<i64>()) {
            let codec = codec();
            prop_assert_eq!(codec.derive(SaleId::new(id)), codec.derive(SaleId::new(id)));
        }
    }
}
