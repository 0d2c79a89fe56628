//! Signed token claim set.

use crate::digest::sha256_hex;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Identity carried by an access token. Refresh tokens carry the empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account: String,
}

impl Payload {
    pub fn new(user_id: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            account: account.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_empty() && self.account.is_empty()
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token ID
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Expiry (Unix seconds)
    pub exp: i64,
    #[serde(flatten)]
    pub payload: Payload,
    /// Binding of this token to the session it was issued for
    pub sum: String,
}

/// Checksum binding a token ID to a session ID
pub fn checksum(token_id: &str, sess_id: &str) -> String {
    sha256_hex(token_id, sess_id)
}

impl Claims {
    /// Whether these claims were issued for `sess_id`.
    ///
    /// Pure and constant-time in the checksum length.
    pub fn checksum_matches(&self, sess_id: &str) -> bool {
        let expected = checksum(&self.jti, sess_id);
        expected.as_bytes().ct_eq(self.sum.as_bytes()).into()
    }
}
