//! Strategy resolvers.
//!
//! Each submodule owns the validation and comparison logic for one
//! authentication strategy and maps untrusted input to a
//! [`ResolutionOutcome`]. The engine dispatches on [`StrategyInput`] — a
//! closed set, so a new strategy is a compile-time exhaustiveness error
//! everywhere it matters.

pub mod biometric;
pub mod magic;
pub mod otp;
pub mod password;
pub mod social;

#[cfg(test)]
pub(crate) mod test_support;

use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;

use crate::account::{Account, AccountSeed};
use crate::challenge::{OtpChallengeStore, OTP_CODE_LEN};
use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::hasher::CredentialHasher;
use crate::repository::AccountRepository;
use crate::token::TokenCodec;

/// Untrusted caller input, one variant per supported strategy.
///
/// `Debug` is safe to log: secret-bearing fields are `SecretString` and
/// render redacted.
#[derive(Debug, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum StrategyInput {
    Password {
        email: String,
        password: SecretString,
        #[serde(default)]
        first_name: Option<String>,
        #[serde(default)]
        last_name: Option<String>,
        #[serde(default)]
        phone: Option<String>,
    },
    Social {
        email: String,
        provider: String,
        provider_id: String,
        #[serde(default)]
        first_name: Option<String>,
        #[serde(default)]
        last_name: Option<String>,
        #[serde(default)]
        avatar: Option<String>,
    },
    Otp {
        phone: String,
        code: String,
    },
    #[serde(rename = "magic-link")]
    MagicLink {
        token: String,
    },
    Biometric {
        email: String,
        assertion: SecretString,
    },
}

impl StrategyInput {
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Social { .. } => "social",
            Self::Otp { .. } => "otp",
            Self::MagicLink { .. } => "magic-link",
            Self::Biometric { .. } => "biometric",
        }
    }
}

/// Typed reason a resolver refused the input.
///
/// The engine decides which reasons may be rendered precisely and which
/// collapse into a generic credential failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    InvalidFormat(&'static str),
    /// The account exists but is owned by a different strategy.
    StrategyMismatch,
    /// No account matches and the input cannot seed one.
    NotFound,
    /// The account exists and the presented secret does not verify.
    BadSecret,
    ChallengeInvalid,
    ChallengeExpired,
}

/// What a resolver concluded about the input.
#[derive(Debug)]
pub enum ResolutionOutcome {
    Authenticated(Account),
    NeedsCreation(AccountSeed),
    Rejected(RejectReason),
}

/// Borrowed view of the engine's collaborators handed to each resolver.
pub(crate) struct ResolverDeps<'a> {
    pub(crate) repo: &'a dyn AccountRepository,
    pub(crate) hasher: &'a CredentialHasher,
    pub(crate) codec: &'a TokenCodec,
    pub(crate) otp_store: &'a OtpChallengeStore,
    pub(crate) config: &'a EngineConfig,
    pub(crate) now: OffsetDateTime,
}

impl ResolverDeps<'_> {
    pub(crate) async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(timed(
            self.config.upstream_timeout(),
            "account repository",
            self.repo.find_by_email(email),
        )
        .await??)
    }

    pub(crate) async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, AuthError> {
        Ok(timed(
            self.config.upstream_timeout(),
            "account repository",
            self.repo.find_by_phone(phone),
        )
        .await??)
    }
}

/// Bound an upstream call by `duration`.
///
/// Elapsing is an error in its own right and is never retried here; the inner
/// result comes back untouched so callers can still branch on typed failures
/// such as duplicate keys.
pub(crate) async fn timed<T, E>(
    duration: Duration,
    what: &'static str,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<Result<T, E>, AuthError> {
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => Ok(result),
        Err(_) => Err(AuthError::UpstreamTimeout { what }),
    }
}

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Normalize a phone number for lookup/uniqueness checks.
pub(crate) fn normalize_phone(phone: &str) -> String {
    phone.trim().to_string()
}

/// Loose shape check: an optional leading `+`, then at least seven digits
/// with common separators tolerated.
pub(crate) fn valid_phone(phone_normalized: &str) -> bool {
    if phone_normalized.is_empty() {
        return false;
    }
    let rest = phone_normalized.strip_prefix('+').unwrap_or(phone_normalized);
    let digits = rest.chars().filter(char::is_ascii_digit).count();
    digits >= 7
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

/// Exactly six ASCII digits.
pub(crate) fn valid_otp_code(code: &str) -> bool {
    code.len() == OTP_CODE_LEN && code.chars().all(|c| c.is_ascii_digit())
}

/// Trim an optional field, dropping it entirely when empty.
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
