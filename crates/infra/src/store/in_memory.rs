use std::collections::HashMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};

use chrono::{DateTime, Utc};

use gatehouse_auth::{Account, RoleLink, Session};
use gatehouse_core::{AccountId, RecordId, RoleLinkId};
use gatehouse_kernel::{
    AccountStore, Record, RecordStore, SessionStore, StoreError, StoreResult, Transactional,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    role_links: HashMap<RoleLinkId, RoleLink>,
    sessions: HashMap<String, Session>,
    records: HashMap<RecordId, Record>,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub accounts: usize,
    pub role_links: usize,
    pub sessions: usize,
    pub records: usize,
}

/// In-memory relational-style store.
///
/// Intended for tests/dev. Like a database without `ON DELETE CASCADE`, it
/// refuses to delete a row that other rows still reference, so dependents
/// must be removed first (that is what deletion hooks are for).
///
/// Transactions snapshot all tables and restore them on failure. They are
/// serialized with each other and with every write made outside a
/// transaction, so a rollback never discards another caller's committed
/// write. Nested `atomically` calls on the same thread join the outer
/// transaction. Reads do not wait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    tx_lock: Mutex<()>,
    tx_owner: Mutex<Option<ThreadId>>,
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> StoreResult<TableCounts> {
        let t = self.read()?;
        Ok(TableCounts {
            accounts: t.accounts.len(),
            role_links: t.role_links.len(),
            sessions: t.sessions.len(),
            records: t.records.len(),
        })
    }

    /// Drop every session that is no longer valid at `now`.
    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let purged = self.mutate(|t| {
            let before = t.sessions.len();
            t.sessions.retain(|_, s| s.expires_at > now);
            Ok(before - t.sessions.len())
        })?;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions purged");
        }
        Ok(purged)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| poisoned())
    }

    /// Apply a write. Outside a transaction it waits for any open one to
    /// finish first.
    fn mutate<R>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<R>) -> StoreResult<R> {
        if self.in_transaction()? {
            return f(&mut *self.write()?);
        }
        let _serial = self.tx_lock.lock().map_err(|_| poisoned())?;
        f(&mut *self.write()?)
    }

    fn set_owner(&self, owner: Option<ThreadId>) -> StoreResult<()> {
        *self.tx_owner.lock().map_err(|_| poisoned())? = owner;
        Ok(())
    }

    fn in_transaction(&self) -> StoreResult<bool> {
        let owner = self.tx_owner.lock().map_err(|_| poisoned())?;
        Ok(*owner == Some(thread::current().id()))
    }
}

impl Transactional for InMemoryStore {
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        if self.in_transaction()? {
            return f(self);
        }

        let _serial = self.tx_lock.lock().map_err(|_| poisoned())?;
        let snapshot = self.read()?.clone();
        self.set_owner(Some(thread::current().id()))?;

        let result = f(self);

        self.set_owner(None)?;
        if result.is_err() {
            *self.write()? = snapshot;
            tracing::debug!("transaction rolled back");
        }
        result
    }
}

impl AccountStore for InMemoryStore {
    fn find_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    fn count_accounts(&self) -> StoreResult<usize> {
        Ok(self.read()?.accounts.len())
    }

    fn insert_account(&self, account: Account) -> StoreResult<()> {
        self.mutate(|t| {
            if t.accounts.contains_key(&account.id) {
                return Err(StoreError::duplicate("account", account.id));
            }
            if t.accounts.values().any(|a| a.username == account.username) {
                return Err(StoreError::duplicate("account", &account.username));
            }
            t.accounts.insert(account.id, account);
            Ok(())
        })
    }

    fn update_account(&self, account: Account) -> StoreResult<()> {
        self.mutate(|t| {
            if !t.accounts.contains_key(&account.id) {
                return Err(StoreError::missing("account", account.id));
            }
            if t
                .accounts
                .values()
                .any(|a| a.id != account.id && a.username == account.username)
            {
                return Err(StoreError::duplicate("account", &account.username));
            }
            t.accounts.insert(account.id, account);
            Ok(())
        })
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<()> {
        self.mutate(|t| {
            if !t.accounts.contains_key(&id) {
                return Err(StoreError::missing("account", id));
            }
            if t.role_links.values().any(|l| l.account_id == id) {
                return Err(StoreError::referenced("account", id, "role_link"));
            }
            if t.sessions.values().any(|s| s.account_id == id) {
                return Err(StoreError::referenced("account", id, "session"));
            }
            if t.records.values().any(|r| r.owner == id) {
                return Err(StoreError::referenced("account", id, "record"));
            }
            t.accounts.remove(&id);
            Ok(())
        })
    }

    fn role_links_for(&self, account_id: AccountId) -> StoreResult<Vec<RoleLink>> {
        let mut links: Vec<RoleLink> = self
            .read()?
            .role_links
            .values()
            .filter(|l| l.account_id == account_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| l.role);
        Ok(links)
    }

    fn insert_role_link(&self, link: RoleLink) -> StoreResult<()> {
        self.mutate(|t| {
            if !t.accounts.contains_key(&link.account_id) {
                return Err(StoreError::missing("account", link.account_id));
            }
            if t.role_links.contains_key(&link.id) {
                return Err(StoreError::duplicate("role_link", link.id));
            }
            t.role_links.insert(link.id, link);
            Ok(())
        })
    }

    fn delete_role_link(&self, id: RoleLinkId) -> StoreResult<()> {
        self.mutate(|t| {
            t.role_links
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::missing("role_link", id))
        })
    }
}

impl SessionStore for InMemoryStore {
    fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(self.read()?.sessions.get(token_hash).cloned())
    }

    fn sessions_for(&self, account_id: AccountId) -> StoreResult<Vec<Session>> {
        Ok(self
            .read()?
            .sessions
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect())
    }

    fn insert_session(&self, session: Session) -> StoreResult<()> {
        self.mutate(|t| {
            if !t.accounts.contains_key(&session.account_id) {
                return Err(StoreError::missing("account", session.account_id));
            }
            if t.sessions.contains_key(&session.token_hash) {
                return Err(StoreError::duplicate("session", &session.token_hash));
            }
            t.sessions.insert(session.token_hash.clone(), session);
            Ok(())
        })
    }

    fn delete_session(&self, token_hash: &str) -> StoreResult<()> {
        self.mutate(|t| {
            t.sessions
                .remove(token_hash)
                .map(|_| ())
                .ok_or_else(|| StoreError::missing("session", token_hash))
        })
    }
}

impl RecordStore for InMemoryStore {
    fn find_record(&self, id: RecordId) -> StoreResult<Option<Record>> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    fn list_records(&self) -> StoreResult<Vec<Record>> {
        let mut records: Vec<Record> = self.read()?.records.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn records_owned_by(&self, owner: AccountId) -> StoreResult<Vec<Record>> {
        Ok(self
            .read()?
            .records
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect())
    }

    fn insert_record(&self, record: Record) -> StoreResult<()> {
        self.mutate(|t| {
            if !t.accounts.contains_key(&record.owner) {
                return Err(StoreError::missing("account", record.owner));
            }
            if t.records.contains_key(&record.id) {
                return Err(StoreError::duplicate("record", record.id));
            }
            t.records.insert(record.id, record);
            Ok(())
        })
    }

    fn update_record(&self, record: Record) -> StoreResult<()> {
        self.mutate(|t| {
            match t.records.get_mut(&record.id) {
                Some(slot) => {
                    *slot = record;
                    Ok(())
                }
                None => Err(StoreError::missing("record", record.id)),
            }
        })
    }

    fn delete_record(&self, id: RecordId) -> StoreResult<()> {
        self.mutate(|t| {
            t.records
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| StoreError::missing("record", id))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use chrono::Duration;

    use gatehouse_auth::Role;

    use super::*;

    fn account(store: &InMemoryStore, username: &str) -> Account {
        let account = Account::new(username, "$argon2id$stub", Utc::now());
        store.insert_account(account.clone()).unwrap();
        account
    }

    #[test]
    fn usernames_are_unique() {
        let store = InMemoryStore::new();
        account(&store, "alice");
        let err = store
            .insert_account(Account::new("alice", "$argon2id$stub", Utc::now()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { entity: "account", .. }));
    }

    #[test]
    fn referenced_account_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let alice = account(&store, "alice");
        let link = RoleLink::new(alice.id, Role::Member);
        store.insert_role_link(link.clone()).unwrap();

        let err = store.delete_account(alice.id).unwrap_err();
        assert!(matches!(err, StoreError::Referenced { dependent: "role_link", .. }));

        store.delete_role_link(link.id).unwrap();
        store.delete_account(alice.id).unwrap();
        assert_eq!(store.count_accounts().unwrap(), 0);
    }

    #[test]
    fn dependents_require_an_existing_account() {
        let store = InMemoryStore::new();
        let ghost = AccountId::new();
        assert!(store.insert_role_link(RoleLink::new(ghost, Role::Admin)).is_err());
        let issued = Session::start(ghost, Utc::now(), Duration::hours(1)).unwrap();
        assert!(store.insert_session(issued.session).is_err());
    }

    #[test]
    fn failed_transaction_restores_every_table() {
        let store = InMemoryStore::new();
        let alice = account(&store, "alice");
        let before = store.counts().unwrap();

        let result: Result<(), StoreError> = store.atomically(|tx| {
            tx.insert_role_link(RoleLink::new(alice.id, Role::Editor))?;
            tx.insert_account(Account::new("bob", "$argon2id$stub", Utc::now()))?;
            Err(StoreError::Unavailable("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.counts().unwrap(), before);
        assert!(store.find_account_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn rollback_keeps_writes_made_by_other_threads() {
        let store = InMemoryStore::new();
        let (opened, wait_opened) = mpsc::channel();

        thread::scope(|scope| {
            let failing = scope.spawn(|| {
                store.atomically(|tx| -> Result<(), StoreError> {
                    tx.insert_account(Account::new("doomed", "$argon2id$stub", Utc::now()))?;
                    opened.send(()).unwrap();
                    thread::sleep(std::time::Duration::from_millis(100));
                    Err(StoreError::Unavailable("boom".to_string()))
                })
            });

            wait_opened.recv().unwrap();
            // Blocks until the transaction above has rolled back.
            account(&store, "alice");
            assert!(failing.join().unwrap().is_err());
        });

        assert!(store.find_account_by_username("alice").unwrap().is_some());
        assert!(store.find_account_by_username("doomed").unwrap().is_none());
    }

    #[test]
    fn nested_transactions_join_the_outer_one() {
        let store = InMemoryStore::new();
        let result: Result<(), StoreError> = store.atomically(|tx| {
            tx.atomically(|inner| inner.insert_account(Account::new("carol", "$argon2id$stub", Utc::now())))?;
            Err(StoreError::Unavailable("outer fails".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.count_accounts().unwrap(), 0);
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let store = InMemoryStore::new();
        let alice = account(&store, "alice");
        let now = Utc::now();
        let short = Session::start(alice.id, now, Duration::minutes(5)).unwrap();
        let long = Session::start(alice.id, now, Duration::hours(5)).unwrap();
        store.insert_session(short.session).unwrap();
        store.insert_session(long.session.clone()).unwrap();

        assert_eq!(store.purge_expired_sessions(now + Duration::hours(1)).unwrap(), 1);
        assert_eq!(store.sessions_for(alice.id).unwrap(), vec![long.session]);
    }
}
