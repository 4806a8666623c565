//! One-time-passcode over phone strategy.
//!
//! The submitted code is compared against the challenge issued server-side
//! for that phone number; syntactic validity alone proves nothing. A correct
//! code for an unseen phone creates a phone-only account.

use super::{
    normalize_phone, valid_otp_code, valid_phone, RejectReason, ResolutionOutcome, ResolverDeps,
};
use crate::account::{AccountSeed, Strategy};
use crate::challenge::ChallengeFailure;
use crate::error::AuthError;

pub(crate) async fn resolve(
    deps: &ResolverDeps<'_>,
    phone: &str,
    code: &str,
) -> Result<ResolutionOutcome, AuthError> {
    let phone = normalize_phone(phone);
    if phone.is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "phone",
        )));
    }
    if !valid_phone(&phone) {
        return Ok(ResolutionOutcome::Rejected(RejectReason::InvalidFormat(
            "phone",
        )));
    }
    let code = code.trim();
    if code.is_empty() {
        return Ok(ResolutionOutcome::Rejected(RejectReason::MissingField(
            "code",
        )));
    }
    if !valid_otp_code(code) {
        return Ok(ResolutionOutcome::Rejected(RejectReason::InvalidFormat(
            "code",
        )));
    }

    if let Err(failure) = deps.otp_store.consume(&phone, code, deps.now).await {
        let reason = match failure {
            ChallengeFailure::Invalid => RejectReason::ChallengeInvalid,
            ChallengeFailure::Expired => RejectReason::ChallengeExpired,
        };
        return Ok(ResolutionOutcome::Rejected(reason));
    }

    if let Some(mut account) = deps.find_by_phone(&phone).await? {
        if account.strategy != Strategy::Otp {
            // The phone belongs to an account owned by another strategy; a
            // consumed code does not let the caller switch it.
            return Ok(ResolutionOutcome::Rejected(RejectReason::StrategyMismatch));
        }
        account.otp_verified = true;
        return Ok(ResolutionOutcome::Authenticated(account));
    }

    // Phone-only account; the email slot settles later through an explicit
    // profile update, not a fabricated placeholder address.
    Ok(ResolutionOutcome::NeedsCreation(AccountSeed {
        phone: Some(phone),
        strategy: Strategy::Otp,
        ..AccountSeed::default()
    }))
}
