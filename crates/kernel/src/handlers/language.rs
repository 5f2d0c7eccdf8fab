use serde_json::json;

use gatehouse_core::DomainError;

use crate::action::{ActionOutcome, ClientEffect, GuardedAction};
use crate::context::RequestContext;
use crate::error::{ActionResult, GuardError, HandleError};
use crate::guard::{Guard, current_session};
use crate::handler::Handler;
use crate::settings::Settings;
use crate::store::{AccountStore, SessionLookup, SessionStore, Transactional};

const ACTIONS: &[&str] = &["list", "set"];

/// Interface language selection.
///
/// Anonymous visitors get a cookie only; signed-in accounts also get the
/// choice saved on their account.
pub struct LanguageHandler<'a, S> {
    store: &'a S,
    settings: &'a Settings,
}

impl<'a, S: AccountStore + SessionStore + Transactional> LanguageHandler<'a, S> {
    pub fn new(store: &'a S, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    fn list(&self, _ctx: &RequestContext) -> ActionResult {
        Ok(ActionOutcome::json(json!({
            "languages": self.settings.languages,
            "default": self.settings.default_language,
        })))
    }

    fn set(&self, ctx: &RequestContext) -> ActionResult {
        let code = ctx.require_field("language")?.trim().to_lowercase();
        if !self.settings.supports_language(&code) {
            return Err(DomainError::validation(format!("unsupported language '{code}'")).into());
        }

        match current_session(ctx, self.store) {
            Ok(session) => {
                let saved = self.store.atomically(|store| -> Result<bool, HandleError> {
                    let Some(mut account) = store.find_account(session.account_id)? else {
                        return Ok(false);
                    };
                    account.language = Some(code.clone());
                    store.update_account(account)?;
                    Ok(true)
                })?;
                if saved {
                    tracing::debug!(account_id = %session.account_id, language = %code, "language saved");
                }
            }
            Err(GuardError::NoSession) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(ActionOutcome::json(json!({ "language": code }))
            .with_effect(ClientEffect::SetLanguage(code)))
    }
}

impl<S: AccountStore + SessionStore + Transactional> Handler for LanguageHandler<'_, S> {
    fn area(&self) -> &'static str {
        "language"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn route(&self, name: &str) -> Option<GuardedAction<'_>> {
        let action = match name {
            "list" => GuardedAction::builder("list").run(move |ctx: &RequestContext| self.list(ctx)),
            "set" => GuardedAction::builder("set")
                .guard(Guard::token())
                .run(move |ctx: &RequestContext| self.set(ctx)),
            _ => return None,
        };
        Some(action)
    }

    fn sessions(&self) -> &dyn SessionLookup {
        self.store
    }
}
