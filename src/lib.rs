//! # Ensaluti (Multi-Strategy Authentication Engine)
//!
//! `ensaluti` authenticates a user through one of several interchangeable
//! strategies and, on success, issues a signed, time-bounded bearer session
//! token. The HTTP layer, the durable account store, and SMS/email transport
//! all live outside this crate and are injected as capabilities.
//!
//! ## Strategies
//!
//! - **password** — email + Argon2id-verified password; the only strategy
//!   with an explicit registration/login split.
//! - **social** — a federated provider's (email, subject) assertion; counts
//!   as authoritative proof of the email, so it unifies onto whatever account
//!   owns that address.
//! - **otp** — a six-digit code delivered to a phone number and compared
//!   against the server-side challenge issued for it.
//! - **magic-link** — a short-lived signed token delivered to an email.
//! - **biometric** — an opaque platform-authenticator assertion, recorded as
//!   a digest.
//!
//! ## Accounts
//!
//! One account per identity. Email and phone are unique when present; the
//! strategy that created an account owns it forever. Presenting a different
//! strategy against an existing identity either passes the owning strategy's
//! rules or fails — it never silently switches ownership.
//!
//! ## Sessions
//!
//! Session tokens are PASETO `v4.local`: self-contained, tamper-proof, and
//! dead at expiry. There is no server-side revocation list; verification
//! needs only the signing secret and the repository.
//!
//! ## Error discipline
//!
//! Every failure returns typed. Identity-guessing-sensitive failures render
//! one fixed message — an unknown email and a wrong password are
//! indistinguishable to the caller.

pub mod account;
pub mod challenge;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod notifier;
pub mod repository;
pub mod resolver;
pub mod token;

pub use account::{merge_profile, Account, AccountSeed, AccountSummary, Profile, Strategy};
pub use challenge::{ChallengeFailure, OtpChallengeStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{ChallengeReceipt, Engine, SessionGrant};
pub use error::AuthError;
pub use hasher::{CredentialHasher, HashError, HasherConfig};
pub use notifier::{DeliveryError, DeliveryPayload, Destination, LogNotifier, Notifier};
pub use repository::{
    AccountRepository, IdentityField, MemoryAccountRepository, RepositoryError,
};
pub use resolver::{RejectReason, ResolutionOutcome, StrategyInput};
pub use token::{TokenClaims, TokenCodec, TokenError, TokenPurpose};
