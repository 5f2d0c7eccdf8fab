//! Storage collaborator contracts.
//!
//! The kernel never talks to a database directly; it is handed something that
//! implements these traits. [`Transactional`] is what makes cascading deletes
//! all-or-nothing.

use thiserror::Error;

use gatehouse_auth::{Account, Role, RoleLink, Session};
use gatehouse_core::{AccountId, RecordId, RoleLinkId};

use crate::Record;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation error (infrastructure, not business logic).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    Missing { entity: &'static str, key: String },

    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// The row is still referenced by dependents; storage never cascades.
    #[error("{entity} {key} is still referenced by {dependent}")]
    Referenced {
        entity: &'static str,
        key: String,
        dependent: &'static str,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn missing(entity: &'static str, key: impl ToString) -> Self {
        Self::Missing { entity, key: key.to_string() }
    }

    pub fn duplicate(entity: &'static str, key: impl ToString) -> Self {
        Self::Duplicate { entity, key: key.to_string() }
    }

    pub fn referenced(entity: &'static str, key: impl ToString, dependent: &'static str) -> Self {
        Self::Referenced {
            entity,
            key: key.to_string(),
            dependent,
        }
    }
}

pub trait AccountStore {
    fn find_account(&self, id: AccountId) -> StoreResult<Option<Account>>;
    fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;
    fn count_accounts(&self) -> StoreResult<usize>;
    fn insert_account(&self, account: Account) -> StoreResult<()>;
    fn update_account(&self, account: Account) -> StoreResult<()>;
    fn delete_account(&self, id: AccountId) -> StoreResult<()>;

    fn role_links_for(&self, account_id: AccountId) -> StoreResult<Vec<RoleLink>>;
    fn insert_role_link(&self, link: RoleLink) -> StoreResult<()>;
    fn delete_role_link(&self, id: RoleLinkId) -> StoreResult<()>;
}

/// Sessions are keyed by the hash of their cleartext token.
pub trait SessionStore {
    fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;
    fn sessions_for(&self, account_id: AccountId) -> StoreResult<Vec<Session>>;
    fn insert_session(&self, session: Session) -> StoreResult<()>;
    fn delete_session(&self, token_hash: &str) -> StoreResult<()>;
}

pub trait RecordStore {
    fn find_record(&self, id: RecordId) -> StoreResult<Option<Record>>;
    fn list_records(&self) -> StoreResult<Vec<Record>>;
    fn records_owned_by(&self, owner: AccountId) -> StoreResult<Vec<Record>>;
    fn insert_record(&self, record: Record) -> StoreResult<()>;
    fn update_record(&self, record: Record) -> StoreResult<()>;
    fn delete_record(&self, id: RecordId) -> StoreResult<()>;
}

/// All-or-nothing execution.
///
/// Every write performed through the `&Self` handed to `f` is committed only
/// if `f` returns `Ok`; on `Err` the store is left exactly as before the call.
pub trait Transactional {
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;
}

/// Everything the built-in handlers need from storage.
pub trait Storage: AccountStore + SessionStore + RecordStore + Transactional {}

impl<T> Storage for T where T: AccountStore + SessionStore + RecordStore + Transactional {}

/// Read-only view used by session guards.
///
/// Object-safe so guards can be evaluated without knowing the concrete store.
pub trait SessionLookup {
    fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    /// Roles granted to `account_id`, or `None` when the account no longer exists.
    fn roles_of(&self, account_id: AccountId) -> StoreResult<Option<Vec<Role>>>;
}

impl<T> SessionLookup for T
where
    T: SessionStore + AccountStore + ?Sized,
{
    fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        SessionStore::find_session(self, token_hash)
    }

    fn roles_of(&self, account_id: AccountId) -> StoreResult<Option<Vec<Role>>> {
        if self.find_account(account_id)?.is_none() {
            return Ok(None);
        }
        let roles = self
            .role_links_for(account_id)?
            .into_iter()
            .map(|link| link.role)
            .collect();
        Ok(Some(roles))
    }
}
