//! Pre-execution checks attached to actions.

use gatehouse_auth::{AuthzError, CsrfError, Role, Session, authorize, validate_session, verify_csrf};

use crate::context::RequestContext;
use crate::error::GuardError;
use crate::store::SessionLookup;

/// A capability check evaluated before an action body runs.
///
/// Guards hold no state of their own; they read the request context and the
/// session lookup at evaluation time and never write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Anti-forgery check: the submitted token must hash to the stored value.
    Token,
    /// Valid session required; with `min_role`, the account must hold at least that role.
    Session { min_role: Option<Role> },
}

impl Guard {
    pub const fn token() -> Self {
        Guard::Token
    }

    pub const fn session() -> Self {
        Guard::Session { min_role: None }
    }

    pub const fn session_with(min_role: Role) -> Self {
        Guard::Session {
            min_role: Some(min_role),
        }
    }

    pub fn check(&self, ctx: &RequestContext, sessions: &dyn SessionLookup) -> Result<(), GuardError> {
        match self {
            Guard::Token => check_token(ctx),
            Guard::Session { min_role } => {
                let (_, roles) = resolve_session(ctx, sessions)?;
                let Some(min_role) = min_role else {
                    return Ok(());
                };
                authorize(&roles, *min_role).map_err(|e| match e {
                    AuthzError::InsufficientRole { required, held } => {
                        GuardError::InsufficientRole { required, held }
                    }
                })
            }
        }
    }
}

impl core::fmt::Display for Guard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Guard::Token => f.write_str("token"),
            Guard::Session { min_role: None } => f.write_str("session"),
            Guard::Session { min_role: Some(role) } => write!(f, "session({role})"),
        }
    }
}

fn check_token(ctx: &RequestContext) -> Result<(), GuardError> {
    verify_csrf(ctx.submitted_csrf(), ctx.stored_csrf_hash()).map_err(|e| match e {
        CsrfError::Missing => GuardError::MissingToken,
        CsrfError::Mismatch => GuardError::TokenMismatch,
    })
}

/// Resolve the request's session, or fail with `NoSession`.
///
/// Unknown tokens, expired sessions and sessions whose account has vanished
/// all count as "no session". Action bodies use this to find the acting
/// account after their session guard has passed.
pub fn current_session(ctx: &RequestContext, sessions: &dyn SessionLookup) -> Result<Session, GuardError> {
    resolve_session(ctx, sessions).map(|(session, _)| session)
}

fn resolve_session(
    ctx: &RequestContext,
    sessions: &dyn SessionLookup,
) -> Result<(Session, Vec<Role>), GuardError> {
    let token = ctx.session_token().ok_or(GuardError::NoSession)?;
    let session = sessions
        .find_session(&Session::hash_token(token))
        .map_err(GuardError::Unavailable)?
        .ok_or(GuardError::NoSession)?;

    validate_session(&session, ctx.now()).map_err(|e| {
        tracing::debug!(account_id = %session.account_id, reason = %e, "session rejected");
        GuardError::NoSession
    })?;

    let roles = sessions
        .roles_of(session.account_id)
        .map_err(GuardError::Unavailable)?
        .ok_or(GuardError::NoSession)?;

    Ok((session, roles))
}
