//! Account model shared by every authentication strategy.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The strategy that created an account.
///
/// Exactly one strategy owns each account and it never changes afterwards; a
/// different strategy presented against the same email/phone either passes the
/// owning strategy's rules or is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Password,
    Google,
    Github,
    Otp,
    Magic,
    Biometric,
}

impl Strategy {
    /// Map a federated provider name to its strategy, case-insensitively.
    #[must_use]
    pub fn from_provider(provider: &str) -> Option<Self> {
        match provider.trim().to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Google => "google",
            Self::Github => "github",
            Self::Otp => "otp",
            Self::Magic => "magic",
            Self::Biometric => "biometric",
        }
    }

    #[must_use]
    pub fn is_social(&self) -> bool {
        matches!(self, Self::Google | Self::Github)
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Password
    }
}

/// Optional public profile fields attached to an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

/// Merge an incoming profile into an existing one.
///
/// Incoming values only fill slots the account has not set yet; nothing the
/// user already chose is overwritten during re-authentication.
#[must_use]
pub fn merge_profile(existing: &Profile, incoming: &Profile) -> Profile {
    fn fill(current: &Option<String>, candidate: &Option<String>) -> Option<String> {
        match current {
            Some(value) if !value.is_empty() => Some(value.clone()),
            _ => candidate.clone().filter(|value| !value.is_empty()),
        }
    }

    Profile {
        avatar: fill(&existing.avatar, &incoming.avatar),
        bio: fill(&existing.bio, &incoming.bio),
        location: fill(&existing.location, &incoming.location),
        website: fill(&existing.website, &incoming.website),
    }
}

/// The unit of identity.
///
/// Secrets (`password_hash`, `biometric_hash`) live here but never leave the
/// engine; callers only ever see an [`AccountSummary`].
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    /// Unique, normalized lowercase. Absent only for phone-only OTP accounts.
    pub email: Option<String>,
    /// Unique when present, sparse.
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Immutable after creation.
    pub strategy: Strategy,
    /// Present if and only if `strategy == Strategy::Password`.
    pub password_hash: Option<String>,
    /// Federated subject id, set once at creation for social accounts.
    pub provider_subject: Option<String>,
    /// Derived assertion digest; refreshed on biometric re-assertion.
    pub biometric_hash: Option<String>,
    pub verified: bool,
    pub otp_verified: bool,
    pub company: Option<String>,
    pub profile: Profile,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

impl Account {
    /// Materialize a new account from a creation seed.
    ///
    /// Accounts are verified on creation: every strategy only creates after a
    /// successful proof (password set, federated assertion, consumed code,
    /// confirmed link, biometric assertion).
    #[must_use]
    pub fn from_seed(id: Uuid, seed: AccountSeed, now: OffsetDateTime) -> Self {
        Self {
            id,
            email: seed.email,
            phone: seed.phone,
            first_name: seed.first_name,
            last_name: seed.last_name,
            strategy: seed.strategy,
            password_hash: seed.password_hash,
            provider_subject: seed.provider_subject,
            biometric_hash: seed.biometric_hash,
            verified: true,
            otp_verified: seed.strategy == Strategy::Otp,
            company: None,
            profile: seed.profile,
            created_at: now,
            last_login: Some(now),
        }
    }

    #[must_use]
    pub fn is_phone_only(&self) -> bool {
        self.email.is_none() && self.phone.is_some()
    }

    /// Secret-free projection handed back to callers.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            email: self.email.clone(),
            phone: self.phone.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            strategy: self.strategy,
            verified: self.verified,
            company: self.company.clone(),
            profile: self.profile.clone(),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Creation payload a resolver hands to the repository.
#[derive(Clone, Debug, Default)]
pub struct AccountSeed {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub strategy: Strategy,
    pub password_hash: Option<String>,
    pub provider_subject: Option<String>,
    pub biometric_hash: Option<String>,
    pub profile: Profile,
}

/// What a caller is allowed to see about an account.
///
/// The shape deliberately omits `password_hash`, `provider_subject` and
/// `biometric_hash`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub strategy: Strategy,
    pub verified: bool,
    pub company: Option<String>,
    pub profile: Profile,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}
