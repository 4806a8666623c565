//! Biometric assertion strategy.
//!
//! The platform authenticator verifying the user is an external capability;
//! this resolver receives its opaque assertion payload, derives a digest, and
//! records it. Re-assertion against a biometric account is accepted and the
//! stored digest refreshed; an assertion against an account owned by another
//! strategy is rejected.

use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use super::{normalize_email, valid_email, RejectReason, ResolutionOutcome, ResolverDeps};
use crate::account::{AccountSeed, Strategy};
use crate::error::AuthError;

/// Digest an assertion payload; only the digest is ever stored.
pub(crate) fn assertion_digest(assertion: &str) -> String {
    let digest = Sha256::digest(assertion.as_bytes());
    Base64UrlUnpadded::encode_string(digest.as_slice())
}

pub(crate) async fn resolve(
    deps: &ResolverDeps<'_>,
    email: &str,
    assertion: &SecretString,
) -> Result<ResolutionOutcome, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "email",
        )));
    }
    if !valid_email(&email) {
        return Ok(ResolutionOutcome::Rejected(RejectReason::InvalidFormat(
            "email",
        )));
    }
    if assertion.expose_secret().trim().is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "assertion",
        )));
    }

    let digest = assertion_digest(assertion.expose_secret());

    if let Some(mut account) = deps.find_by_email(&email).await? {
        if account.strategy != Strategy::Biometric {
            return Ok(ResolutionOutcome::Rejected(RejectReason::StrategyMismatch));
        }
        // Re-enrollment: the fresh assertion replaces the stored digest.
        account.biometric_hash = Some(digest);
        return Ok(ResolutionOutcome::Authenticated(account));
    }

    Ok(ResolutionOutcome::NeedsCreation(AccountSeed {
        email: Some(email),
        strategy: Strategy::Biometric,
        biometric_hash: Some(digest),
        ..AccountSeed::default()
    }))
}
