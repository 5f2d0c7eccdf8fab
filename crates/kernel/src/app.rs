//! Area → handler wiring over one store.

use crate::cleanup::default_hooks;
use crate::context::RequestContext;
use crate::error::{ActionResult, DispatchError};
use crate::handler::{HandleAction, Handler};
use crate::handlers::{AccountsHandler, LanguageHandler, ManagementHandler};
use crate::hooks::HookRegistry;
use crate::settings::Settings;
use crate::store::Storage;

pub const AREAS: &[&str] = &["accounts", "language", "records"];

/// Owns the store, the deletion hooks and the settings, and hands out
/// per-request handlers borrowing them.
pub struct Gatehouse<S: 'static> {
    store: S,
    hooks: HookRegistry<S>,
    settings: Settings,
}

impl<S: Storage + 'static> Gatehouse<S> {
    /// Wire `store` with every built-in deletion hook.
    pub fn new(store: S, settings: Settings) -> Self {
        Self::with_hooks(store, default_hooks(), settings)
    }

    pub fn with_hooks(store: S, hooks: HookRegistry<S>, settings: Settings) -> Self {
        Self {
            store,
            hooks,
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hooks(&self) -> &HookRegistry<S> {
        &self.hooks
    }

    pub fn accounts(&self) -> AccountsHandler<'_, S> {
        AccountsHandler::new(&self.store, &self.hooks, &self.settings)
    }

    pub fn language(&self) -> LanguageHandler<'_, S> {
        LanguageHandler::new(&self.store, &self.settings)
    }

    pub fn records(&self) -> ManagementHandler<'_, S> {
        ManagementHandler::new(&self.store, &self.hooks)
    }

    /// Handler serving `area` (trimmed, case-insensitive).
    pub fn handler(&self, area: &str) -> Option<Box<dyn Handler + '_>> {
        let handler: Box<dyn Handler + '_> = match area.trim().to_lowercase().as_str() {
            "accounts" => Box::new(self.accounts()),
            "language" => Box::new(self.language()),
            "records" => Box::new(self.records()),
            _ => return None,
        };
        Some(handler)
    }

    pub fn dispatch(&self, area: &str, action: &str, ctx: &RequestContext) -> ActionResult {
        let Some(handler) = self.handler(area) else {
            tracing::info!(area = %area.trim(), "unknown area");
            return Err(DispatchError::UnknownArea(area.trim().to_lowercase()).into());
        };
        handler.handle_action(action, ctx)
    }
}
