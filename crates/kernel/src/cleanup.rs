//! Deletion hooks for records that depend on an [`Account`].

use gatehouse_auth::Account;
use gatehouse_core::Entity;

use crate::error::HookError;
use crate::hooks::{DeletionHook, HookRegistry};
use crate::store::{AccountStore, RecordStore, SessionStore, Storage, StoreError};

/// Deletes every role link of the account.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleLinkCleanup;

impl<S: AccountStore + ?Sized> DeletionHook<Account, S> for RoleLinkCleanup {
    fn name(&self) -> &'static str {
        "role_links"
    }

    fn on_delete_entity(&self, store: &S, account: &Account) -> Result<(), HookError> {
        let fail = |e: StoreError| HookError::cleanup("role_links", Account::ENTITY_TYPE, e);
        let links = store.role_links_for(account.id).map_err(fail)?;
        for link in &links {
            store.delete_role_link(link.id).map_err(fail)?;
        }
        tracing::debug!(account_id = %account.id, removed = links.len(), "role links removed");
        Ok(())
    }
}

/// Ends every session of the account.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCleanup;

impl<S: SessionStore + ?Sized> DeletionHook<Account, S> for SessionCleanup {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn on_delete_entity(&self, store: &S, account: &Account) -> Result<(), HookError> {
        let fail = |e: StoreError| HookError::cleanup("sessions", Account::ENTITY_TYPE, e);
        let sessions = store.sessions_for(account.id).map_err(fail)?;
        for session in &sessions {
            store.delete_session(&session.token_hash).map_err(fail)?;
        }
        tracing::debug!(account_id = %account.id, removed = sessions.len(), "sessions removed");
        Ok(())
    }
}

/// Deletes every record the account owns.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnedRecordCleanup;

impl<S: RecordStore + ?Sized> DeletionHook<Account, S> for OwnedRecordCleanup {
    fn name(&self) -> &'static str {
        "owned_records"
    }

    fn on_delete_entity(&self, store: &S, account: &Account) -> Result<(), HookError> {
        let fail = |e: StoreError| HookError::cleanup("owned_records", Account::ENTITY_TYPE, e);
        let records = store.records_owned_by(account.id).map_err(fail)?;
        for record in &records {
            store.delete_record(record.id).map_err(fail)?;
        }
        tracing::debug!(account_id = %account.id, removed = records.len(), "owned records removed");
        Ok(())
    }
}

/// Registry with every built-in account hook.
pub fn default_hooks<S: Storage + 'static>() -> HookRegistry<S> {
    HookRegistry::new()
        .with::<Account, _>(RoleLinkCleanup)
        .with::<Account, _>(SessionCleanup)
        .with::<Account, _>(OwnedRecordCleanup)
}
