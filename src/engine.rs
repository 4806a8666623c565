//! Multi-strategy authentication engine.
//!
//! One attempt flows straight through: dispatch to the strategy's resolver,
//! apply the unification/creation policy, persist, mint a session. There is
//! no retry inside an attempt; callers retry by starting a new one. The
//! engine holds no cross-request state beyond its injected collaborators, so
//! any number of instances can run behind a load balancer sharing only the
//! repository and the signing secret.

use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::account::{Account, AccountSeed, AccountSummary};
use crate::challenge::OtpChallengeStore;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::AuthError;
use crate::hasher::CredentialHasher;
use crate::notifier::{DeliveryPayload, Destination, Notifier};
use crate::repository::{AccountRepository, RepositoryError};
use crate::resolver::{
    self, biometric, magic, otp, password, social, RejectReason, ResolutionOutcome, ResolverDeps,
    StrategyInput,
};
use crate::token::{TokenCodec, TokenError, TokenPurpose};

/// A freshly minted session plus the account it belongs to.
#[derive(Clone, Debug, Serialize)]
pub struct SessionGrant {
    /// Opaque bearer token; present it to [`Engine::verify_session`].
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub account: AccountSummary,
}

/// Acknowledgement of a challenge send.
///
/// Deliberately carries no code, token, or link: the secret travels through
/// the notifier only.
#[derive(Clone, Debug)]
pub struct ChallengeReceipt {
    pub destination: Destination,
    pub expires_at: OffsetDateTime,
}

/// What the caller is trying to do; shapes how password rejections render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Intent {
    Register,
    Login,
    Any,
}

pub struct Engine {
    config: EngineConfig,
    codec: TokenCodec,
    hasher: CredentialHasher,
    repo: Arc<dyn AccountRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    otp_store: OtpChallengeStore,
}

impl Engine {
    /// Wire an engine from its collaborators. Nothing global is read; tests
    /// inject a fixed clock and an in-memory repository.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        codec: TokenCodec,
        hasher: CredentialHasher,
        repo: Arc<dyn AccountRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let otp_store = OtpChallengeStore::new(config.otp_ttl_seconds());
        Self {
            config,
            codec,
            hasher,
            repo,
            notifier,
            clock,
            otp_store,
        }
    }

    /// Create an account for the given strategy input.
    ///
    /// For the password strategy an existing account is a hard
    /// [`AuthError::DuplicateIdentity`]; the other strategies unify onto the
    /// existing account instead.
    #[instrument(skip_all, fields(strategy = input.strategy_name()))]
    pub async fn register(&self, input: StrategyInput) -> Result<SessionGrant, AuthError> {
        self.attempt(input, Intent::Register).await
    }

    /// Authenticate against an existing account.
    ///
    /// A password login never creates an account; an unknown email renders
    /// exactly like a wrong password.
    #[instrument(skip_all, fields(strategy = input.strategy_name()))]
    pub async fn login(&self, input: StrategyInput) -> Result<SessionGrant, AuthError> {
        self.attempt(input, Intent::Login).await
    }

    /// Strategy-agnostic entry point: resolve, unify-or-create, mint.
    #[instrument(skip_all, fields(strategy = input.strategy_name()))]
    pub async fn authenticate(&self, input: StrategyInput) -> Result<SessionGrant, AuthError> {
        self.attempt(input, Intent::Any).await
    }

    /// Send-phase for OTP and magic-link: issue the challenge and hand it to
    /// the notifier. The receipt never contains the secret.
    #[instrument(skip_all, fields(destination = %destination))]
    pub async fn request_challenge(
        &self,
        destination: Destination,
    ) -> Result<ChallengeReceipt, AuthError> {
        let now = self.clock.now();
        match destination {
            Destination::Sms(phone) => {
                let phone = resolver::normalize_phone(&phone);
                if phone.is_empty() {
                    return Err(AuthError::Validation {
                        field: "phone",
                        message: "missing required field: phone".to_string(),
                    });
                }
                if !resolver::valid_phone(&phone) {
                    return Err(AuthError::Validation {
                        field: "phone",
                        message: "invalid phone".to_string(),
                    });
                }
                let code = self.otp_store.issue(&phone, now).await;
                let destination = Destination::Sms(phone);
                self.deliver(&destination, &DeliveryPayload::OtpCode { code })
                    .await?;
                Ok(ChallengeReceipt {
                    destination,
                    expires_at: now + time::Duration::seconds(self.config.otp_ttl_seconds()),
                })
            }
            Destination::Email(email) => {
                let email = resolver::normalize_email(&email);
                if email.is_empty() {
                    return Err(AuthError::Validation {
                        field: "email",
                        message: "missing required field: email".to_string(),
                    });
                }
                if !resolver::valid_email(&email) {
                    return Err(AuthError::Validation {
                        field: "email",
                        message: "invalid email".to_string(),
                    });
                }
                let token = self
                    .codec
                    .issue(
                        &email,
                        TokenPurpose::MagicLink,
                        self.config.magic_link_ttl_seconds(),
                        now,
                    )
                    .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
                let url = build_magic_url(self.config.magic_link_base_url(), &token);
                let destination = Destination::Email(email);
                self.deliver(&destination, &DeliveryPayload::MagicLink { url })
                    .await?;
                Ok(ChallengeReceipt {
                    destination,
                    expires_at: now
                        + time::Duration::seconds(self.config.magic_link_ttl_seconds()),
                })
            }
        }
    }

    /// Confirm-phase for OTP and magic-link challenges.
    #[instrument(skip_all, fields(strategy = input.strategy_name()))]
    pub async fn confirm_challenge(&self, input: StrategyInput) -> Result<SessionGrant, AuthError> {
        match input {
            StrategyInput::Otp { .. } | StrategyInput::MagicLink { .. } => {
                self.attempt(input, Intent::Any).await
            }
            other => Err(AuthError::Validation {
                field: "strategy",
                message: format!("{} is not a challenge strategy", other.strategy_name()),
            }),
        }
    }

    /// Verify a presented session token and return the account summary.
    #[instrument(skip_all)]
    pub async fn verify_session(&self, token: &str) -> Result<AccountSummary, AuthError> {
        self.authorize(token).await.map(|account| account.summary())
    }

    /// Verify a presented session token and resolve the full account.
    ///
    /// Expired and mis-signed tokens are distinguishable for UX but both
    /// deny; a token whose subject no longer exists is
    /// [`AuthError::AccountNotFound`].
    pub async fn authorize(&self, token: &str) -> Result<Account, AuthError> {
        let now = self.clock.now();
        let claims = self
            .codec
            .verify(token, TokenPurpose::Session, now)
            .map_err(|err| match err {
                TokenError::Expired => AuthError::TokenExpired,
                _ => AuthError::Unauthenticated,
            })?;
        let subject = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::Unauthenticated)?;
        let account = resolver::timed(
            self.config.upstream_timeout(),
            "account repository",
            self.repo.find_by_id(subject),
        )
        .await??;
        account.ok_or(AuthError::AccountNotFound)
    }

    async fn attempt(&self, input: StrategyInput, intent: Intent) -> Result<SessionGrant, AuthError> {
        let now = self.clock.now();
        debug!("authentication attempt received");
        let deps = self.resolver_deps(now);
        let outcome = self.dispatch(&deps, &input).await?;

        // A password login must render every post-lookup rejection as the one
        // generic credential failure; only input faults the caller can see
        // without an account lookup stay precise.
        if intent == Intent::Login {
            if let StrategyInput::Password { .. } = &input {
                match &outcome {
                    ResolutionOutcome::NeedsCreation(_) => {
                        return Err(AuthError::InvalidCredential);
                    }
                    ResolutionOutcome::Rejected(reason)
                        if !matches!(
                            reason,
                            RejectReason::MissingField("email" | "password")
                                | RejectReason::InvalidFormat("email")
                        ) =>
                    {
                        return Err(AuthError::InvalidCredential);
                    }
                    _ => {}
                }
            }
        }

        match outcome {
            ResolutionOutcome::Authenticated(account) => {
                if intent == Intent::Register
                    && matches!(input, StrategyInput::Password { .. })
                {
                    return Err(AuthError::DuplicateIdentity);
                }
                debug!(account_id = %account.id, "resolved existing account");
                self.finish_existing(account, now).await
            }
            ResolutionOutcome::NeedsCreation(seed) => {
                let (account, raced) = self.create_account(seed, &input).await?;
                if raced {
                    debug!(account_id = %account.id, "creation raced; unified onto existing account");
                    self.finish_existing(account, now).await
                } else {
                    debug!(account_id = %account.id, "account created");
                    self.mint(account, now)
                }
            }
            ResolutionOutcome::Rejected(reason) => {
                debug!(?reason, "attempt rejected");
                Err(self.map_rejection(&input, reason, intent))
            }
        }
    }

    async fn dispatch(
        &self,
        deps: &ResolverDeps<'_>,
        input: &StrategyInput,
    ) -> Result<ResolutionOutcome, AuthError> {
        match input {
            StrategyInput::Password {
                email,
                password,
                first_name,
                last_name,
                phone,
            } => {
                password::resolve(
                    deps,
                    email,
                    password,
                    first_name.as_deref(),
                    last_name.as_deref(),
                    phone.as_deref(),
                )
                .await
            }
            StrategyInput::Social {
                email,
                provider,
                provider_id,
                first_name,
                last_name,
                avatar,
            } => {
                social::resolve(
                    deps,
                    email,
                    provider,
                    provider_id,
                    first_name.as_deref(),
                    last_name.as_deref(),
                    avatar.as_deref(),
                )
                .await
            }
            StrategyInput::Otp { phone, code } => otp::resolve(deps, phone, code).await,
            StrategyInput::MagicLink { token } => magic::resolve(deps, token).await,
            StrategyInput::Biometric { email, assertion } => {
                biometric::resolve(deps, email, assertion).await
            }
        }
    }

    /// Create the seeded account, falling back to the race winner.
    ///
    /// Exactly one of N concurrent creations for the same identity wins at
    /// the repository; the losers re-look the identity up once and continue
    /// as an existing-account authentication. Password registration is the
    /// exception: there the duplicate is the caller's answer.
    async fn create_account(
        &self,
        seed: AccountSeed,
        input: &StrategyInput,
    ) -> Result<(Account, bool), AuthError> {
        let timeout = self.config.upstream_timeout();
        let email = seed.email.clone();
        let phone = seed.phone.clone();
        match resolver::timed(timeout, "account repository", self.repo.create(seed)).await? {
            Ok(account) => Ok((account, false)),
            Err(RepositoryError::Duplicate(_)) => {
                if matches!(input, StrategyInput::Password { .. }) {
                    return Err(AuthError::DuplicateIdentity);
                }
                let existing = match (email, phone) {
                    (Some(email), _) => {
                        resolver::timed(
                            timeout,
                            "account repository",
                            self.repo.find_by_email(&email),
                        )
                        .await??
                    }
                    (None, Some(phone)) => {
                        resolver::timed(
                            timeout,
                            "account repository",
                            self.repo.find_by_phone(&phone),
                        )
                        .await??
                    }
                    (None, None) => None,
                };
                let account = existing.ok_or_else(|| {
                    AuthError::UpstreamUnavailable(anyhow::anyhow!(
                        "account creation conflicted but no winner resolved"
                    ))
                })?;
                Ok((account, true))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn finish_existing(
        &self,
        mut account: Account,
        now: OffsetDateTime,
    ) -> Result<SessionGrant, AuthError> {
        account.last_login = Some(now);
        debug!(account_id = %account.id, "persisting re-authentication");
        resolver::timed(
            self.config.upstream_timeout(),
            "account repository",
            self.repo.update(&account),
        )
        .await??;
        self.mint(account, now)
    }

    fn mint(&self, account: Account, now: OffsetDateTime) -> Result<SessionGrant, AuthError> {
        let ttl = self.config.session_ttl_seconds();
        let token = self
            .codec
            .issue(&account.id.to_string(), TokenPurpose::Session, ttl, now)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        debug!(account_id = %account.id, "session issued");
        Ok(SessionGrant {
            token,
            expires_at: now + time::Duration::seconds(ttl),
            account: account.summary(),
        })
    }

    fn map_rejection(
        &self,
        input: &StrategyInput,
        reason: RejectReason,
        intent: Intent,
    ) -> AuthError {
        match reason {
            RejectReason::MissingField(field) => AuthError::Validation {
                field,
                message: format!("missing required field: {field}"),
            },
            RejectReason::InvalidFormat(field) => AuthError::Validation {
                field,
                message: format!("invalid {field}"),
            },
            RejectReason::ChallengeInvalid => AuthError::ChallengeInvalid,
            RejectReason::ChallengeExpired => AuthError::ChallengeExpired,
            RejectReason::BadSecret | RejectReason::StrategyMismatch => {
                // The account exists; for password registration that is a
                // duplicate, everywhere else it must not be distinguishable
                // from any other credential failure.
                if intent == Intent::Register && matches!(input, StrategyInput::Password { .. }) {
                    AuthError::DuplicateIdentity
                } else {
                    AuthError::InvalidCredential
                }
            }
            RejectReason::NotFound => AuthError::InvalidCredential,
        }
    }

    fn resolver_deps(&self, now: OffsetDateTime) -> ResolverDeps<'_> {
        ResolverDeps {
            repo: self.repo.as_ref(),
            hasher: &self.hasher,
            codec: &self.codec,
            otp_store: &self.otp_store,
            config: &self.config,
            now,
        }
    }

    async fn deliver(
        &self,
        destination: &Destination,
        payload: &DeliveryPayload,
    ) -> Result<(), AuthError> {
        let delivered = resolver::timed(
            self.config.upstream_timeout(),
            "notifier",
            self.notifier.deliver(destination, payload),
        )
        .await?;
        delivered.map_err(|err| {
            warn!(destination = %destination, "challenge delivery failed");
            AuthError::DeliveryFailed(err)
        })
    }
}

/// Build the link a magic-link email points at.
fn build_magic_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/auth/magic#token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::hasher::HasherConfig;
    use crate::notifier::LogNotifier;
    use crate::repository::MemoryAccountRepository;
    use anyhow::Result;
    use secrecy::SecretString;

    const OTP_TTL: i64 = 5 * 60;

    fn engine() -> Result<Engine> {
        let clock = Arc::new(FixedClock::at(1_700_000_000));
        let repo = Arc::new(MemoryAccountRepository::with_clock(
            Arc::clone(&clock) as Arc<dyn Clock>
        ));
        Ok(Engine::new(
            EngineConfig::new("https://app.example/".to_string())
                .with_otp_ttl_seconds(OTP_TTL),
            TokenCodec::from_seed(&[7u8; 32])?,
            CredentialHasher::new(
                HasherConfig::default()
                    .with_memory_kib(8 * 1024)
                    .with_iterations(1),
            )?,
            repo,
            Arc::new(LogNotifier),
            clock,
        ))
    }

    #[test]
    fn build_magic_url_trims_trailing_slash() {
        let url = build_magic_url("https://app.example/", "tok");
        assert_eq!(url, "https://app.example/auth/magic#token=tok");
    }

    #[tokio::test]
    async fn confirm_challenge_rejects_non_challenge_strategies() -> Result<()> {
        let engine = engine()?;
        let result = engine
            .confirm_challenge(StrategyInput::Password {
                email: "a@x.com".to_string(),
                password: SecretString::from("secret1".to_string()),
                first_name: None,
                last_name: None,
                phone: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Validation { field: "strategy", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn authorize_rejects_garbage_token() -> Result<()> {
        let engine = engine()?;
        let result = engine.authorize("not-a-token").await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
        Ok(())
    }

    #[tokio::test]
    async fn request_challenge_validates_destination() -> Result<()> {
        let engine = engine()?;

        let result = engine
            .request_challenge(Destination::Sms("  ".to_string()))
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Validation { field: "phone", .. })
        ));

        let result = engine
            .request_challenge(Destination::Email("nope".to_string()))
            .await;
        assert!(matches!(
            result,
            Err(AuthError::Validation { field: "email", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn challenge_receipt_carries_destination_and_expiry_only() -> Result<()> {
        let engine = engine()?;
        let receipt = engine
            .request_challenge(Destination::Sms(" +15551234567 ".to_string()))
            .await?;
        assert_eq!(
            receipt.destination,
            Destination::Sms("+15551234567".to_string())
        );
        assert_eq!(receipt.expires_at.unix_timestamp(), 1_700_000_000 + OTP_TTL);
        Ok(())
    }
}
