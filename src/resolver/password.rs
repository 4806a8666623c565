//! Email + password strategy.

use secrecy::{ExposeSecret, SecretString};

use super::{
    clean, normalize_email, normalize_phone, valid_email, valid_phone, RejectReason,
    ResolutionOutcome, ResolverDeps,
};
use crate::account::{AccountSeed, Strategy};
use crate::error::AuthError;

pub(crate) const MIN_PASSWORD_LENGTH: usize = 6;

/// Resolve a password attempt.
///
/// An existing account is matched against its stored Argon2 digest; an unseen
/// email becomes a creation seed when the caller supplied the name fields
/// registration requires. The password length floor only gates creation — a
/// short guess against an existing account must fail exactly like any other
/// wrong password.
pub(crate) async fn resolve(
    deps: &ResolverDeps<'_>,
    email: &str,
    password: &SecretString,
    first_name: Option<&str>,
    last_name: Option<&str>,
    phone: Option<&str>,
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
    if password.expose_secret().is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "password",
        )));
    }

    if let Some(account) = deps.find_by_email(&email).await? {
        if account.strategy != Strategy::Password {
            return Ok(ResolutionOutcome::Rejected(RejectReason::StrategyMismatch));
        }
        let Some(digest) = account.password_hash.as_deref() else {
            // Invariant breach in the store; indistinguishable from a bad
            // secret as far as the caller may learn.
            return Ok(ResolutionOutcome::Rejected(RejectReason::BadSecret));
        };
        if deps.hasher.verify(password.expose_secret(), digest) {
            return Ok(ResolutionOutcome::Authenticated(account));
        }
        return Ok(ResolutionOutcome::Rejected(RejectReason::BadSecret));
    }

    // Creation path: registration requires the caller's name fields.
    let Some(first_name) = clean(first_name) else {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "first_name",
        )));
    };
    let Some(last_name) = clean(last_name) else {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "last_name",
        )));
    };
    if password.expose_secret().len() < MIN_PASSWORD_LENGTH {
        return Ok(ResolutionOutcome::Rejected(RejectReason::InvalidFormat(
            "password",
        )));
    }
    let phone = match clean(phone) {
        Some(phone) => {
            let phone = normalize_phone(&phone);
            if !valid_phone(&phone) {
                return Ok(ResolutionOutcome::Rejected(RejectReason::InvalidFormat(
                    "phone",
                )));
            }
            Some(phone)
        }
        None => None,
    };

    let password_hash = deps.hasher.hash(password.expose_secret())?;
    Ok(ResolutionOutcome::NeedsCreation(AccountSeed {
        email: Some(email),
        phone,
        first_name: Some(first_name),
        last_name: Some(last_name),
        strategy: Strategy::Password,
        password_hash: Some(password_hash),
        ..AccountSeed::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::fixture;
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn unseen_email_with_names_seeds_creation() -> Result<()> {
        let fx = fixture()?;
        let outcome = resolve(
            &fx.deps(),
            "A@X.com",
            &SecretString::from("secret1".to_string()),
            Some("A"),
            Some("B"),
            None,
        )
        .await?;
        match outcome {
            ResolutionOutcome::NeedsCreation(seed) => {
                assert_eq!(seed.email.as_deref(), Some("a@x.com"));
                assert_eq!(seed.strategy, Strategy::Password);
                assert!(seed.password_hash.is_some());
            }
            other => anyhow::bail!("expected NeedsCreation, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn matching_password_authenticates() -> Result<()> {
        let fx = fixture()?;
        let account = fx.seed_password_account("a@x.com", "secret1").await?;

        let outcome = resolve(
            &fx.deps(),
            "a@x.com",
            &SecretString::from("secret1".to_string()),
            None,
            None,
            None,
        )
        .await?;
        match outcome {
            ResolutionOutcome::Authenticated(found) => assert_eq!(found.id, account.id),
            other => anyhow::bail!("expected Authenticated, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_rejects_bad_secret() -> Result<()> {
        let fx = fixture()?;
        fx.seed_password_account("a@x.com", "secret1").await?;

        // Shorter than the creation floor on purpose: login never leaks a
        // format error where a credential failure belongs.
        let outcome = resolve(
            &fx.deps(),
            "a@x.com",
            &SecretString::from("wrong".to_string()),
            None,
            None,
            None,
        )
        .await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::BadSecret)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn foreign_strategy_account_rejects_mismatch() -> Result<()> {
        let fx = fixture()?;
        let seed = AccountSeed {
            email: Some("a@x.com".to_string()),
            strategy: Strategy::Google,
            provider_subject: Some("google-1".to_string()),
            ..AccountSeed::default()
        };
        fx.seed_account(seed).await?;

        let outcome = resolve(
            &fx.deps(),
            "a@x.com",
            &SecretString::from("secret1".to_string()),
            None,
            None,
            None,
        )
        .await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::StrategyMismatch)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn creation_enforces_password_floor_and_names() -> Result<()> {
        let fx = fixture()?;

        let outcome = resolve(
            &fx.deps(),
            "a@x.com",
            &SecretString::from("short".to_string()),
            Some("A"),
            Some("B"),
            None,
        )
        .await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::InvalidFormat("password"))
        ));

        let outcome = resolve(
            &fx.deps(),
            "a@x.com",
            &SecretString::from("secret1".to_string()),
            None,
            None,
            None,
        )
        .await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::MissingField("first_name"))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_email_rejects_format() -> Result<()> {
        let fx = fixture()?;
        let outcome = resolve(
            &fx.deps(),
            "not-an-email",
            &SecretString::from("secret1".to_string()),
            Some("A"),
            Some("B"),
            None,
        )
        .await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::InvalidFormat("email"))
        ));
        Ok(())
    }
}
