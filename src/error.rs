//! Engine-level error taxonomy.
//!
//! Every failure an authentication attempt can produce maps to exactly one
//! variant here; nothing is logged-and-swallowed. Identity-guessing-sensitive
//! failures (unknown email, wrong password, strategy mismatch) collapse into
//! [`AuthError::InvalidCredential`] so callers cannot probe which check failed.

use thiserror::Error;

use crate::hasher::HashError;
use crate::notifier::DeliveryError;
use crate::repository::RepositoryError;

/// The one message rendered for every credential failure, regardless of cause.
pub const INVALID_CREDENTIAL_MESSAGE: &str = "invalid email or password";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or malformed input; safe to show verbatim.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// An account already exists for the identity being registered.
    /// Only surfaced on the password-registration path.
    #[error("an account already exists for this identity")]
    DuplicateIdentity,

    /// Wrong secret, unknown identity, or mismatched strategy.
    #[error("{}", INVALID_CREDENTIAL_MESSAGE)]
    InvalidCredential,

    /// The submitted code or link does not match an outstanding challenge.
    #[error("the code or link is not valid")]
    ChallengeInvalid,

    #[error("the code or link has expired")]
    ChallengeExpired,

    /// The presented session token is missing, malformed, or mis-signed.
    #[error("authentication required")]
    Unauthenticated,

    /// The session token was valid once but its lifetime is over.
    #[error("session expired")]
    TokenExpired,

    /// The token verified but its subject no longer resolves to an account.
    #[error("account no longer exists")]
    AccountNotFound,

    /// The notifier could not hand off the challenge.
    #[error("failed to deliver the challenge")]
    DeliveryFailed(#[source] DeliveryError),

    /// An upstream call exceeded the caller-supplied timeout.
    #[error("{what} timed out")]
    UpstreamTimeout { what: &'static str },

    /// Repository or notifier failure; recoverable by retrying the attempt.
    #[error("upstream dependency unavailable")]
    UpstreamUnavailable(#[source] anyhow::Error),

    /// Engine-side fault (hashing, token minting). Never caller-correctable.
    #[error("internal authentication error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable code for API payloads and logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::DuplicateIdentity => "duplicate_identity",
            Self::InvalidCredential => "invalid_credential",
            Self::ChallengeInvalid => "challenge_invalid",
            Self::ChallengeExpired => "challenge_expired",
            Self::Unauthenticated => "unauthenticated",
            Self::TokenExpired => "token_expired",
            Self::AccountNotFound => "account_not_found",
            Self::DeliveryFailed(_) => "delivery_failed",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    /// Message safe to render to an end user.
    ///
    /// Upstream and internal faults hide their source chain; everything else
    /// displays as-is.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::UpstreamTimeout { .. } | Self::UpstreamUnavailable(_) | Self::Internal(_) => {
                "service temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(_) => Self::DuplicateIdentity,
            RepositoryError::NotFound => Self::AccountNotFound,
            RepositoryError::Unavailable(source) => Self::UpstreamUnavailable(source),
        }
    }
}

impl From<HashError> for AuthError {
    fn from(err: HashError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_one_message() {
        // Unknown email and wrong password both surface as InvalidCredential,
        // so message equality is structural; pin the text anyway.
        assert_eq!(
            AuthError::InvalidCredential.to_string(),
            INVALID_CREDENTIAL_MESSAGE
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AuthError::DuplicateIdentity.code(), "duplicate_identity");
        assert_eq!(AuthError::TokenExpired.code(), "token_expired");
        assert_eq!(
            AuthError::UpstreamTimeout {
                what: "account repository"
            }
            .code(),
            "upstream_timeout"
        );
    }

    #[test]
    fn upstream_detail_is_hidden_from_clients() {
        let err = AuthError::UpstreamUnavailable(anyhow::anyhow!("pg: connection refused"));
        assert!(!err.client_message().contains("pg:"));

        let err = AuthError::Validation {
            field: "email",
            message: "missing required field: email".to_string(),
        };
        assert_eq!(err.client_message(), "missing required field: email");
    }

    #[test]
    fn repository_errors_map_to_engine_errors() {
        use crate::repository::IdentityField;

        let err: AuthError = RepositoryError::Duplicate(IdentityField::Email).into();
        assert!(matches!(err, AuthError::DuplicateIdentity));

        let err: AuthError = RepositoryError::NotFound.into();
        assert!(matches!(err, AuthError::AccountNotFound));
    }
}
