//! Failure taxonomy for dispatch, guards, deletion hooks and action bodies.
//!
//! Every kind exposes a stable `code()` so transports and clients can match on
//! the failure without parsing messages.

use thiserror::Error;

use gatehouse_auth::{PasswordError, Role, SessionValidationError};
use gatehouse_core::DomainError;

use crate::action::ActionOutcome;
use crate::store::StoreError;

/// Result of dispatching or executing an action.
pub type ActionResult = Result<ActionOutcome, HandleError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No route for the (normalized) action name.
    #[error("unknown action '{action}' in {area}")]
    NotFound { area: &'static str, action: String },

    /// No handler serves the requested functional area.
    #[error("unknown area '{0}'")]
    UnknownArea(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("anti-forgery token missing")]
    MissingToken,

    #[error("anti-forgery token mismatch")]
    TokenMismatch,

    #[error("no active session")]
    NoSession,

    #[error("insufficient role: '{required}' required")]
    InsufficientRole { required: Role, held: Option<Role> },

    /// The session store could not be read while evaluating a guard.
    #[error("session store unavailable: {0}")]
    Unavailable(StoreError),
}

impl GuardError {
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::MissingToken => "missing_token",
            GuardError::TokenMismatch => "token_mismatch",
            GuardError::NoSession => "no_session",
            GuardError::InsufficientRole { .. } => "insufficient_role",
            GuardError::Unavailable(_) => "session_unavailable",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// A registered hook could not clean up its dependent records.
    #[error("deletion hook '{hook}' failed for {entity_type}: {reason}")]
    Cleanup {
        hook: &'static str,
        entity_type: &'static str,
        reason: String,
    },

    /// Hooks succeeded but removing the entity itself failed.
    #[error("deleting {entity_type} failed: {source}")]
    Delete {
        entity_type: &'static str,
        source: StoreError,
    },

    /// The surrounding transaction could not be opened or committed.
    #[error("deletion transaction failed: {0}")]
    Transaction(#[from] StoreError),
}

impl HookError {
    pub fn cleanup(hook: &'static str, entity_type: &'static str, reason: impl ToString) -> Self {
        Self::Cleanup {
            hook,
            entity_type,
            reason: reason.to_string(),
        }
    }
}

/// Failure raised by an action body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("credential processing failed: {0}")]
    Credentials(#[from] PasswordError),

    #[error("session could not be started: {0}")]
    Session(#[from] SessionValidationError),
}

impl ActionError {
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::Domain(e) => e.code(),
            ActionError::Store(_) => "store_error",
            ActionError::Credentials(_) => "credential_error",
            ActionError::Session(_) => "session_error",
        }
    }
}

/// Anything `handle_action` can fail with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl HandleError {
    pub fn code(&self) -> &'static str {
        match self {
            HandleError::Dispatch(DispatchError::NotFound { .. }) => "action_not_found",
            HandleError::Dispatch(DispatchError::UnknownArea(_)) => "area_not_found",
            HandleError::Guard(e) => e.code(),
            HandleError::Hook(_) => "deletion_failed",
            HandleError::Action(e) => e.code(),
        }
    }
}

impl From<DomainError> for HandleError {
    fn from(value: DomainError) -> Self {
        HandleError::Action(ActionError::Domain(value))
    }
}

impl From<StoreError> for HandleError {
    fn from(value: StoreError) -> Self {
        HandleError::Action(ActionError::Store(value))
    }
}

impl From<PasswordError> for HandleError {
    fn from(value: PasswordError) -> Self {
        HandleError::Action(ActionError::Credentials(value))
    }
}

impl From<SessionValidationError> for HandleError {
    fn from(value: SessionValidationError) -> Self {
        HandleError::Action(ActionError::Session(value))
    }
}
