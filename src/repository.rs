//! Account persistence interface and the in-memory reference implementation.
//!
//! The engine only ever talks to [`AccountRepository`]; any durable store can
//! sit behind it as long as `create` enforces the unique-identity invariants
//! atomically. Registration race safety depends on that guarantee.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::account::{Account, AccountSeed};
use crate::clock::{Clock, SystemClock};

/// Unique identity column implicated in a duplicate-key rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityField {
    Email,
    Phone,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint on the named field would be violated.
    #[error("an account already exists for this {0}")]
    Duplicate(IdentityField),
    #[error("account not found")]
    NotFound,
    #[error("account store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// `email` is expected pre-normalized (trimmed, lowercase).
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError>;

    /// Create a new account from `seed`.
    ///
    /// Must fail atomically with [`RepositoryError::Duplicate`] before any
    /// write when the seed's email or phone is already taken; under
    /// concurrent creation of the same identity exactly one call may succeed.
    async fn create(&self, seed: AccountSeed) -> Result<Account, RepositoryError>;

    /// Persist updated fields for an existing account, matched by id.
    async fn update(&self, account: &Account) -> Result<(), RepositoryError>;
}

/// Reference implementation over a mutex-guarded map.
///
/// Uniqueness checks and the insert happen under one lock, which gives the
/// same atomicity a database unique index provides.
pub struct MemoryAccountRepository {
    clock: Arc<dyn Clock>,
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl Default for MemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccountRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }

    /// Administrative removal; deletion is not part of the engine's contract
    /// but external processes may drop accounts out from under live sessions.
    pub async fn remove(&self, id: Uuid) -> Option<Account> {
        self.accounts.lock().await.remove(&id)
    }

    fn duplicate_of(
        accounts: &HashMap<Uuid, Account>,
        email: Option<&str>,
        phone: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Option<IdentityField> {
        for account in accounts.values() {
            if Some(account.id) == exclude {
                continue;
            }
            if let (Some(candidate), Some(existing)) = (email, account.email.as_deref()) {
                if candidate == existing {
                    return Some(IdentityField::Email);
                }
            }
            if let (Some(candidate), Some(existing)) = (phone, account.phone.as_deref()) {
                if candidate == existing {
                    return Some(IdentityField::Phone);
                }
            }
        }
        None
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|account| account.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|account| account.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        Ok(self.accounts.lock().await.get(&id).cloned())
    }

    async fn create(&self, seed: AccountSeed) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.lock().await;
        if let Some(field) = Self::duplicate_of(
            &accounts,
            seed.email.as_deref(),
            seed.phone.as_deref(),
            None,
        ) {
            return Err(RepositoryError::Duplicate(field));
        }
        let account = Account::from_seed(Uuid::new_v4(), seed, self.clock.now());
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.lock().await;
        if !accounts.contains_key(&account.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(field) = Self::duplicate_of(
            &accounts,
            account.email.as_deref(),
            account.phone.as_deref(),
            Some(account.id),
        ) {
            return Err(RepositoryError::Duplicate(field));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }
}
