//! HS256 token issuing and verification.

use super::{
    claims::{Claims, Payload, checksum},
    errors::{TokenError, TokenResult},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::Duration;
use uuid::Uuid;

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWT
    pub token: String,
    /// Unique token ID (`jti`)
    pub token_id: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

/// Stateless signer/verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl TokenCodec {
    /// Sign a new token bound to `sess_id`
    ///
    /// # Arguments
    ///
    /// * `payload` - Identity to embed (empty for refresh tokens)
    /// * `ttl` - Validity from now
    /// * `sess_id` - Session the token is bound to through its checksum
    /// * `secret` - HMAC key
    /// * `issuer` - `iss` claim
    ///
    /// # Errors
    ///
    /// * `TokenError::Signing` - Signing failed
    pub fn issue(
        payload: Payload,
        ttl: Duration,
        sess_id: &str,
        secret: &[u8],
        issuer: &str,
    ) -> TokenResult<IssuedToken> {
        let token_id = Uuid::new_v4().to_string();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenError::Malformed(format!("ttl out of range: {}", e)))?;
        let expires_at = Utc::now() + ttl;

        let claims = Claims {
            jti: token_id.clone(),
            iss: issuer.to_string(),
            exp: expires_at.timestamp(),
            payload,
            sum: checksum(&token_id, sess_id),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            token,
            token_id,
            expires_at,
        })
    }

    /// Verify signature and expiry and return the claims
    ///
    /// # Errors
    ///
    /// * `TokenError::SignatureInvalid` - Bad signature or algorithm
    /// * `TokenError::Expired` - Past `exp`
    /// * `TokenError::Malformed` - Anything else
    pub fn verify(token: &str, secret: &[u8]) -> TokenResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issue(sess_id: &str, ttl: Duration) -> IssuedToken {
        TokenCodec::issue(Payload::new("u-42", "alice"), ttl, sess_id, SECRET, "authguard").unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let issued = issue("sess-1", Duration::from_secs(60));
        let claims = TokenCodec::verify(&issued.token, SECRET).unwrap();

        assert_eq!(claims.jti, issued.token_id);
        assert_eq!(claims.iss, "authguard");
        assert_eq!(claims.payload, Payload::new("u-42", "alice"));
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert!(claims.checksum_matches("sess-1"));
    }

    #[test]
    fn test_token_ids_are_unique() {
        let a = issue("s", Duration::from_secs(60));
        let b = issue("s", Duration::from_secs(60));
        assert_ne!(a.token_id, b.token_id);
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let issued = issue("s", Duration::from_secs(60));
        let err = TokenCodec::verify(&issued.token, b"another-secret-another-secret!!!").unwrap_err();
        assert!(matches!(err, TokenError::SignatureInvalid));
    }

    #[test]
    fn test_unexpected_algorithm_is_rejected() {
        let claims = Claims {
            jti: "x".to_string(),
            iss: "authguard".to_string(),
            exp: Utc::now().timestamp() + 60,
            payload: Payload::default(),
            sum: checksum("x", "s"),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let err = TokenCodec::verify(&token, SECRET).unwrap_err();
        assert!(matches!(err, TokenError::SignatureInvalid));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims {
            jti: "x".to_string(),
            iss: "authguard".to_string(),
            exp: Utc::now().timestamp() - 10,
            payload: Payload::default(),
            sum: checksum("x", "s"),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let err = TokenCodec::verify(&token, SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = TokenCodec::verify("not.a.token", SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));

        let err = TokenCodec::verify("", SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let issued = issue("s", Duration::from_secs(60));
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let forged = issue("other", Duration::from_secs(60));
        let forged_parts: Vec<&str> = forged.token.split('.').collect();
        parts[1] = forged_parts[1];

        let err = TokenCodec::verify(&parts.join("."), SECRET).unwrap_err();
        assert!(matches!(err, TokenError::SignatureInvalid));
    }
}
