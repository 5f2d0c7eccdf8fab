use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};

use gatehouse_auth::CsrfToken;

use crate::context::RequestContext;
use crate::error::{ActionResult, HandleError};
use crate::guard::Guard;
use crate::store::SessionLookup;

/// Client-side instruction returned alongside an action's payload.
///
/// The transport layer turns these into cookies; the kernel never touches
/// transport state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEffect {
    /// Store `cookie_value` client-side; the cleartext token goes into the payload.
    IssueCsrf(CsrfToken),
    StartSession {
        token: String,
        expires_at: DateTime<Utc>,
    },
    EndSession,
    SetLanguage(String),
}

/// What a successful action hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub payload: JsonValue,
    pub effects: Vec<ClientEffect>,
}

impl ActionOutcome {
    pub fn json(payload: JsonValue) -> Self {
        Self {
            payload,
            effects: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::json(json!({ "ok": true }))
    }

    pub fn with_effect(mut self, effect: ClientEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

type ActionBody<'a> = Box<dyn Fn(&RequestContext) -> ActionResult + 'a>;

/// An action body bound to the guards its route requires.
///
/// Built per dispatch and dropped afterwards. The guard list is fixed at
/// construction and evaluated in declaration order.
pub struct GuardedAction<'a> {
    name: &'static str,
    guards: Vec<Guard>,
    body: ActionBody<'a>,
}

impl core::fmt::Debug for GuardedAction<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GuardedAction")
            .field("name", &self.name)
            .field("guards", &self.guards)
            .finish_non_exhaustive()
    }
}

impl<'a> GuardedAction<'a> {
    pub fn builder(name: &'static str) -> ActionBuilder {
        ActionBuilder {
            name,
            guards: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// Evaluate every guard in order, then run the body.
    ///
    /// The first failing guard aborts: later guards are not evaluated and the
    /// body never runs. The body's result is returned untouched.
    pub fn execute(&self, ctx: &RequestContext, sessions: &dyn SessionLookup) -> ActionResult {
        for (position, guard) in self.guards.iter().enumerate() {
            if let Err(e) = guard.check(ctx, sessions) {
                tracing::info!(
                    action = self.name,
                    guard = %guard,
                    position,
                    code = e.code(),
                    "guard rejected request"
                );
                return Err(HandleError::Guard(e));
            }
        }

        (self.body)(ctx)
    }
}

/// Collects guards, then binds them to a body in one step.
#[derive(Debug, Clone)]
pub struct ActionBuilder {
    name: &'static str,
    guards: Vec<Guard>,
}

impl ActionBuilder {
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn run<'a, F>(self, body: F) -> GuardedAction<'a>
    where
        F: Fn(&RequestContext) -> ActionResult + 'a,
    {
        GuardedAction {
            name: self.name,
            guards: self.guards,
            body: Box::new(body),
        }
    }
}
