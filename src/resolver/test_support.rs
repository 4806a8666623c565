//! Shared fixtures for resolver unit tests.

use anyhow::Result;
use std::sync::Arc;

use super::ResolverDeps;
use crate::account::{Account, AccountSeed, Strategy};
use crate::challenge::OtpChallengeStore;
use crate::clock::{Clock, FixedClock};
use crate::config::EngineConfig;
use crate::hasher::{CredentialHasher, HasherConfig};
use crate::repository::{AccountRepository, MemoryAccountRepository};
use crate::token::TokenCodec;

pub(crate) const NOW: i64 = 1_700_000_000;

pub(crate) struct Fixture {
    pub(crate) repo: MemoryAccountRepository,
    pub(crate) hasher: CredentialHasher,
    pub(crate) codec: TokenCodec,
    pub(crate) otp_store: OtpChallengeStore,
    pub(crate) config: EngineConfig,
    pub(crate) clock: Arc<FixedClock>,
}

pub(crate) fn fixture() -> Result<Fixture> {
    let clock = Arc::new(FixedClock::at(NOW));
    Ok(Fixture {
        repo: MemoryAccountRepository::with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
        hasher: CredentialHasher::new(
            HasherConfig::default()
                .with_memory_kib(8 * 1024)
                .with_iterations(1),
        )?,
        codec: TokenCodec::from_seed(&[7u8; 32])?,
        otp_store: OtpChallengeStore::new(300),
        config: EngineConfig::new("https://app.example".to_string()),
        clock,
    })
}

impl Fixture {
    pub(crate) fn deps(&self) -> ResolverDeps<'_> {
        ResolverDeps {
            repo: &self.repo,
            hasher: &self.hasher,
            codec: &self.codec,
            otp_store: &self.otp_store,
            config: &self.config,
            now: self.clock.now(),
        }
    }

    pub(crate) async fn seed_account(&self, seed: AccountSeed) -> Result<Account> {
        Ok(self.repo.create(seed).await?)
    }

    pub(crate) async fn seed_password_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account> {
        let seed = AccountSeed {
            email: Some(email.to_string()),
            first_name: Some("A".to_string()),
            last_name: Some("B".to_string()),
            strategy: Strategy::Password,
            password_hash: Some(self.hasher.hash(password)?),
            ..AccountSeed::default()
        };
        self.seed_account(seed).await
    }
}
