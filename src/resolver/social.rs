//! Federated social identity strategy.
//!
//! The provider already verified the user; a (provider, subject, email)
//! triple counts as authoritative proof of the email. An unseen email creates
//! an account owned by the provider's strategy; a seen email re-authenticates
//! whatever account owns it, regardless of that account's own strategy.

use super::{clean, normalize_email, valid_email, RejectReason, ResolutionOutcome, ResolverDeps};
use crate::account::{merge_profile, AccountSeed, Profile, Strategy};
use crate::error::AuthError;

pub(crate) async fn resolve(
    deps: &ResolverDeps<'_>,
    email: &str,
    provider: &str,
    provider_id: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    avatar: Option<&str>,
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
    if provider.trim().is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "provider",
        )));
    }
    let provider_id = provider_id.trim();
    if provider_id.is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "provider_id",
        )));
    }
    let Some(strategy) = Strategy::from_provider(provider) else {
        return Ok(ResolutionOutcome::Rejected(RejectReason::InvalidFormat(
            "provider",
        )));
    };

    let incoming_profile = Profile {
        avatar: clean(avatar),
        ..Profile::default()
    };

    if let Some(mut account) = deps.find_by_email(&email).await? {
        // Re-authentication; the account keeps its own strategy. Incoming
        // profile data only fills slots the user has not set.
        account.profile = merge_profile(&account.profile, &incoming_profile);
        return Ok(ResolutionOutcome::Authenticated(account));
    }

    Ok(ResolutionOutcome::NeedsCreation(AccountSeed {
        email: Some(email),
        first_name: clean(first_name),
        last_name: clean(last_name),
        strategy,
        provider_subject: Some(provider_id.to_string()),
        profile: incoming_profile,
        ..AccountSeed::default()
    }))
}
