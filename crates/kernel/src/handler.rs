//! Name → action routing for one functional area.

use crate::action::GuardedAction;
use crate::context::RequestContext;
use crate::error::{ActionResult, DispatchError};
use crate::store::SessionLookup;

/// Maps action names to guarded actions.
///
/// Implementors provide only the mapping. Construction and guard attachment
/// happen together in [`Handler::route`], so an action can never escape
/// without its guards. Dispatch itself lives in [`HandleAction`].
pub trait Handler {
    /// Functional area, used in logs and not-found errors.
    fn area(&self) -> &'static str;

    /// Every name `route` recognizes (already normalized).
    fn action_names(&self) -> &'static [&'static str];

    /// Build the action for a normalized name, or `None` if unknown.
    fn route(&self, name: &str) -> Option<GuardedAction<'_>>;

    /// Session view handed to guards.
    fn sessions(&self) -> &dyn SessionLookup;
}

/// Dispatch entry point, implemented once for every [`Handler`].
pub trait HandleAction: Handler {
    /// Resolve a raw (unnormalized) name to its guarded action.
    fn resolve(&self, raw_name: &str) -> Option<GuardedAction<'_>> {
        self.route(&normalize_action_name(raw_name))
    }

    /// Normalize, route, run guards and body.
    ///
    /// Unknown names fail with [`DispatchError::NotFound`] before anything is
    /// constructed or evaluated. The action's result is returned unchanged.
    fn handle_action(&self, raw_name: &str, ctx: &RequestContext) -> ActionResult {
        let name = normalize_action_name(raw_name);
        let Some(action) = self.route(&name) else {
            tracing::info!(area = self.area(), action = %name, "unknown action");
            return Err(DispatchError::NotFound {
                area: self.area(),
                action: name,
            }
            .into());
        };

        tracing::debug!(
            area = self.area(),
            action = action.name(),
            guards = action.guards().len(),
            "dispatching action"
        );
        action.execute(ctx, self.sessions())
    }
}

impl<H: Handler + ?Sized> HandleAction for H {}

/// Action names are matched trimmed and lowercased.
pub fn normalize_action_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use gatehouse_auth::{Role, Session};
    use gatehouse_core::AccountId;

    use super::*;
    use crate::action::ActionOutcome;
    use crate::error::HandleError;
    use crate::guard::Guard;
    use crate::store::StoreResult;

    struct NoSessions;

    impl SessionLookup for NoSessions {
        fn find_session(&self, _token_hash: &str) -> StoreResult<Option<Session>> {
            Ok(None)
        }

        fn roles_of(&self, _account_id: AccountId) -> StoreResult<Option<Vec<Role>>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CountingHandler {
        constructed: Cell<usize>,
        runs: Cell<usize>,
    }

    impl Handler for CountingHandler {
        fn area(&self) -> &'static str {
            "test"
        }

        fn action_names(&self) -> &'static [&'static str] {
            &["echo"]
        }

        fn route(&self, name: &str) -> Option<GuardedAction<'_>> {
            match name {
                "echo" => {
                    self.constructed.set(self.constructed.get() + 1);
                    Some(GuardedAction::builder("echo").run(move |_ctx: &RequestContext| {
                        self.runs.set(self.runs.get() + 1);
                        Ok(ActionOutcome::ok())
                    }))
                }
                _ => None,
            }
        }

        fn sessions(&self) -> &dyn SessionLookup {
            &NoSessions
        }
    }

    #[test]
    fn names_are_trimmed_and_lowercased() {
        assert_eq!(normalize_action_name("  Login\t"), "login");
        assert_eq!(normalize_action_name("LOGIN"), "login");
    }

    #[test]
    fn variants_of_a_name_dispatch_to_the_same_action() {
        let handler = CountingHandler::default();
        for raw in ["echo", " Echo ", "ECHO", "\techo\n"] {
            handler.handle_action(raw, &RequestContext::new()).unwrap();
        }
        assert_eq!(handler.runs.get(), 4);
    }

    #[test]
    fn unknown_name_constructs_nothing() {
        let handler = CountingHandler::default();
        let err = handler
            .handle_action("  Frobnicate ", &RequestContext::new())
            .unwrap_err();

        assert_eq!(
            err,
            HandleError::Dispatch(DispatchError::NotFound {
                area: "test",
                action: "frobnicate".to_string(),
            })
        );
        assert_eq!(handler.constructed.get(), 0);
        assert_eq!(handler.runs.get(), 0);
    }

    #[test]
    fn resolve_exposes_the_guard_set_without_running() {
        struct Guarded;
        impl Handler for Guarded {
            fn area(&self) -> &'static str {
                "guarded"
            }
            fn action_names(&self) -> &'static [&'static str] {
                &["secure"]
            }
            fn route(&self, name: &str) -> Option<GuardedAction<'_>> {
                (name == "secure").then(|| {
                    GuardedAction::builder("secure")
                        .guard(Guard::token())
                        .guard(Guard::session_with(Role::Admin))
                        .run(|_ctx: &RequestContext| Ok(ActionOutcome::ok()))
                })
            }
            fn sessions(&self) -> &dyn SessionLookup {
                &NoSessions
            }
        }

        let handler = Guarded;
        let action = handler.resolve(" SECURE").unwrap();
        assert_eq!(action.guards(), &[Guard::token(), Guard::session_with(Role::Admin)]);
        assert!(handler.resolve("insecure").is_none());
    }
}
