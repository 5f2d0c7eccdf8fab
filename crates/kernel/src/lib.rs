//! `gatehouse-kernel` — action dispatch, guard pipeline and cascading deletes.
//!
//! Flow for a request:
//!
//! ```text
//! raw action name
//!   ↓ normalize (trim + lowercase)
//! Handler::route  → GuardedAction (guards attached at construction)
//!   ↓
//! guards in declared order (first failure aborts)
//!   ↓
//! action body → ActionOutcome (payload + client effects)
//! ```
//!
//! Deleting an entity goes through [`hooks::HookRegistry`], which runs every
//! registered [`hooks::DeletionHook`] and the final delete inside one
//! storage transaction.

pub mod action;
pub mod app;
pub mod cleanup;
pub mod context;
pub mod error;
pub mod guard;
pub mod handler;
pub mod handlers;
pub mod hooks;
pub mod record;
pub mod settings;
pub mod store;

pub use action::{ActionBuilder, ActionOutcome, ClientEffect, GuardedAction};
pub use app::Gatehouse;
pub use cleanup::default_hooks;
pub use context::RequestContext;
pub use error::{ActionError, ActionResult, DispatchError, GuardError, HandleError, HookError};
pub use guard::Guard;
pub use handler::{HandleAction, Handler, normalize_action_name};
pub use handlers::{AccountsHandler, LanguageHandler, ManagementHandler};
pub use hooks::{DeletionHook, HookRegistry};
pub use record::Record;
pub use settings::Settings;
pub use store::{
    AccountStore, RecordStore, SessionLookup, SessionStore, Storage, StoreError, StoreResult,
    Transactional,
};
