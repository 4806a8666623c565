//! Magic-link confirmation strategy.
//!
//! The request phase lives in the engine (it only mints and delivers a
//! token); this resolver handles the confirm phase. A verified link is proof
//! of control over the embedded email, so like a federated assertion it
//! re-authenticates whatever account owns that email.

use super::{RejectReason, ResolutionOutcome, ResolverDeps};
use crate::account::{AccountSeed, Strategy};
use crate::error::AuthError;
use crate::token::{TokenError, TokenPurpose};

pub(crate) async fn resolve(
    deps: &ResolverDeps<'_>,
    token: &str,
) -> Result<ResolutionOutcome, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "token",
        )));
    }

    let claims = match deps.codec.verify(token, TokenPurpose::MagicLink, deps.now) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => {
            return Ok(ResolutionOutcome::Rejected(RejectReason::ChallengeExpired));
        }
        Err(_) => {
            return Ok(ResolutionOutcome::Rejected(RejectReason::ChallengeInvalid));
        }
    };

    let email = claims.sub;
    if let Some(account) = deps.find_by_email(&email).await? {
        return Ok(ResolutionOutcome::Authenticated(account));
    }

    Ok(ResolutionOutcome::NeedsCreation(AccountSeed {
        email: Some(email),
        strategy: Strategy::Magic,
        ..AccountSeed::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::fixture;
    use super::*;
    use crate::clock::Clock;
    use anyhow::Result;

    #[tokio::test]
    async fn confirmed_link_seeds_creation_for_unseen_email() -> Result<()> {
        let fx = fixture()?;
        let token = fx.codec.issue(
            "a@x.com",
            TokenPurpose::MagicLink,
            fx.config.magic_link_ttl_seconds(),
            fx.clock.now(),
        )?;
        fx.clock.advance(60);

        let outcome = resolve(&fx.deps(), &token).await?;
        match outcome {
            ResolutionOutcome::NeedsCreation(seed) => {
                assert_eq!(seed.email.as_deref(), Some("a@x.com"));
                assert_eq!(seed.strategy, Strategy::Magic);
            }
            other => anyhow::bail!("expected NeedsCreation, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn confirmed_link_re_authenticates_existing_account() -> Result<()> {
        let fx = fixture()?;
        let account = fx.seed_password_account("a@x.com", "secret1").await?;
        let token = fx.codec.issue(
            "a@x.com",
            TokenPurpose::MagicLink,
            fx.config.magic_link_ttl_seconds(),
            fx.clock.now(),
        )?;

        fx.clock.advance(1);
        let outcome = resolve(&fx.deps(), &token).await?;
        match outcome {
            ResolutionOutcome::Authenticated(found) => {
                assert_eq!(found.id, account.id);
                assert_eq!(found.strategy, Strategy::Password);
            }
            other => anyhow::bail!("expected Authenticated, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn expired_link_rejects_expired() -> Result<()> {
        let fx = fixture()?;
        let token = fx.codec.issue(
            "a@x.com",
            TokenPurpose::MagicLink,
            fx.config.magic_link_ttl_seconds(),
            fx.clock.now(),
        )?;
        fx.clock.advance(fx.config.magic_link_ttl_seconds());

        let outcome = resolve(&fx.deps(), &token).await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::ChallengeExpired)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn session_token_does_not_confirm_a_magic_link() -> Result<()> {
        let fx = fixture()?;
        let token = fx
            .codec
            .issue("account-1", TokenPurpose::Session, 3600, fx.clock.now())?;
        fx.clock.advance(1);

        let outcome = resolve(&fx.deps(), &token).await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::ChallengeInvalid)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn garbage_token_rejects_invalid() -> Result<()> {
        let fx = fixture()?;
        let outcome = resolve(&fx.deps(), "not-a-token").await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::ChallengeInvalid)
        ));

        let outcome = resolve(&fx.deps(), "  ").await?;
        assert!(matches!(
            outcome,
            ResolutionOutcome::Rejected(RejectReason::MissingField("token"))
        ));
        Ok(())
    }
}
