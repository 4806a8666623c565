//! Signed, time-bounded token codec for sessions and magic links.
//!
//! Tokens are PASETO `v4.local`: the payload is authenticated and encrypted
//! under the engine's shared symmetric secret, so claims are tamper-proof and
//! opaque to the client. Claim validation runs against a caller-supplied
//! `now` rather than the wall clock.

use pasetors::errors::Error as PasetorsError;
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::{LocalToken, V4};
use pasetors::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// What a token proves. Session tokens and magic-link challenges share the
/// codec but never verify interchangeably.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPurpose {
    Session,
    MagicLink,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: String,
    pub exp: String,
    pub purpose: TokenPurpose,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid signing key")]
    Key,
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("token not valid for this purpose")]
    WrongPurpose,
    #[error("invalid issued-at")]
    InvalidIat,
    #[error("invalid expiration")]
    InvalidExp,
    #[error("invalid token ttl")]
    InvalidTtl,
    #[error("time format error")]
    TimeFormat,
    #[error("failed to encode claims")]
    Encode,
}

/// Mints and verifies the engine's bearer tokens.
pub struct TokenCodec {
    key: SymmetricKey<V4>,
}

impl TokenCodec {
    /// Build a codec from the shared 32-byte signing secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is not usable as a `v4.local` key.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, TokenError> {
        let key = SymmetricKey::<V4>::from(seed.as_slice()).map_err(|_| TokenError::Key)?;
        Ok(Self { key })
    }

    /// Mint a token for `subject` expiring `ttl_seconds` after `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ttl is non-positive or encoding fails.
    pub fn issue(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl_seconds: i64,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        if ttl_seconds <= 0 {
            return Err(TokenError::InvalidTtl);
        }
        let issued = now.unix_timestamp();
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: rfc3339_from_unix(issued)?,
            exp: rfc3339_from_unix(issued + ttl_seconds)?,
            purpose,
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Encode)?;
        LocalToken::encrypt(&self.key, &payload, None, None).map_err(|_| TokenError::Encode)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or its authentication tag does not match,
    /// - the purpose differs from `expected_purpose`,
    /// - the claims fail time validation (`iat` ≤ now < `exp`, `iat` < `exp`).
    pub fn verify(
        &self,
        token: &str,
        expected_purpose: TokenPurpose,
        now: OffsetDateTime,
    ) -> Result<TokenClaims, TokenError> {
        let untrusted =
            UntrustedToken::<Local, V4>::try_from(token).map_err(|err| map_pasetors_error(&err))?;
        let trusted = LocalToken::decrypt(&self.key, &untrusted, None, None)
            .map_err(|err| map_pasetors_error(&err))?;
        let claims: TokenClaims =
            serde_json::from_str(trusted.payload()).map_err(|_| TokenError::Malformed)?;
        validate_claims(&claims, expected_purpose, now.unix_timestamp())?;
        Ok(claims)
    }
}

/// Convert a unix timestamp to RFC3339.
fn rfc3339_from_unix(unix_seconds: i64) -> Result<String, TokenError> {
    let dt =
        OffsetDateTime::from_unix_timestamp(unix_seconds).map_err(|_| TokenError::TimeFormat)?;
    dt.format(&Rfc3339).map_err(|_| TokenError::TimeFormat)
}

/// Parse an RFC3339 timestamp into unix seconds.
fn unix_from_rfc3339(value: &str) -> Result<i64, TokenError> {
    let dt = OffsetDateTime::parse(value, &Rfc3339).map_err(|_| TokenError::TimeFormat)?;
    Ok(dt.unix_timestamp())
}

fn validate_claims(
    claims: &TokenClaims,
    expected_purpose: TokenPurpose,
    now_unix_seconds: i64,
) -> Result<(), TokenError> {
    if claims.purpose != expected_purpose {
        return Err(TokenError::WrongPurpose);
    }

    let iat = unix_from_rfc3339(&claims.iat).map_err(|_| TokenError::InvalidIat)?;
    let exp = unix_from_rfc3339(&claims.exp).map_err(|_| TokenError::InvalidExp)?;

    if iat > now_unix_seconds {
        return Err(TokenError::InvalidIat);
    }
    if exp <= now_unix_seconds {
        return Err(TokenError::Expired);
    }
    if exp <= iat {
        return Err(TokenError::InvalidTtl);
    }

    Ok(())
}

fn map_pasetors_error(err: &PasetorsError) -> TokenError {
    match err {
        PasetorsError::TokenValidation => TokenError::SignatureMismatch,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const SESSION_TTL: i64 = 7 * 24 * 60 * 60;

    fn at(unix: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(unix).expect("valid timestamp")
    }

    fn codec(seed_byte: u8) -> Result<TokenCodec, TokenError> {
        TokenCodec::from_seed(&[seed_byte; 32])
    }

    #[test]
    fn issue_and_verify_round_trip() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let token = codec.issue("account-1", TokenPurpose::Session, SESSION_TTL, at(NOW))?;
        let claims = codec.verify(&token, TokenPurpose::Session, at(NOW + 60))?;
        assert_eq!(claims.sub, "account-1");
        assert_eq!(claims.purpose, TokenPurpose::Session);
        Ok(())
    }

    #[test]
    fn verify_rejects_wrong_key() -> Result<(), TokenError> {
        let token = codec(7)?.issue("account-1", TokenPurpose::Session, SESSION_TTL, at(NOW))?;
        let result = codec(9)?.verify(&token, TokenPurpose::Session, at(NOW + 60));
        assert!(matches!(result, Err(TokenError::SignatureMismatch)));
        Ok(())
    }

    #[test]
    fn verify_rejects_garbage() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let result = codec.verify("not-a-token", TokenPurpose::Session, at(NOW));
        assert!(matches!(result, Err(TokenError::Malformed)));

        let result = codec.verify("v4.local.%%%", TokenPurpose::Session, at(NOW));
        assert!(matches!(result, Err(TokenError::Malformed)));
        Ok(())
    }

    #[test]
    fn verify_rejects_tampered_body() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let token = codec.issue("account-1", TokenPurpose::Session, SESSION_TTL, at(NOW))?;
        let mut tampered = token.into_bytes();
        let middle = tampered.len() / 2;
        tampered[middle] = if tampered[middle] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).expect("still utf8");
        let result = codec.verify(&tampered, TokenPurpose::Session, at(NOW + 60));
        assert!(matches!(
            result,
            Err(TokenError::SignatureMismatch | TokenError::Malformed)
        ));
        Ok(())
    }

    #[test]
    fn verify_rejects_expired_even_when_well_formed() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let token = codec.issue("account-1", TokenPurpose::Session, SESSION_TTL, at(NOW))?;
        let result = codec.verify(&token, TokenPurpose::Session, at(NOW + SESSION_TTL));
        assert!(matches!(result, Err(TokenError::Expired)));
        Ok(())
    }

    #[test]
    fn verify_rejects_purpose_crossover() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let magic = codec.issue("a@example.com", TokenPurpose::MagicLink, 900, at(NOW))?;
        let result = codec.verify(&magic, TokenPurpose::Session, at(NOW + 1));
        assert!(matches!(result, Err(TokenError::WrongPurpose)));
        Ok(())
    }

    #[test]
    fn verify_rejects_future_issued_at() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let token = codec.issue("account-1", TokenPurpose::Session, SESSION_TTL, at(NOW))?;
        let result = codec.verify(&token, TokenPurpose::Session, at(NOW - 10));
        assert!(matches!(result, Err(TokenError::InvalidIat)));
        Ok(())
    }

    #[test]
    fn issue_rejects_non_positive_ttl() -> Result<(), TokenError> {
        let codec = codec(7)?;
        let result = codec.issue("account-1", TokenPurpose::Session, 0, at(NOW));
        assert!(matches!(result, Err(TokenError::InvalidTtl)));
        Ok(())
    }

    #[test]
    fn from_seed_rejects_short_secret() {
        let result = SymmetricKey::<V4>::from(&[1u8; 16]);
        assert!(result.is_err());
    }
}
