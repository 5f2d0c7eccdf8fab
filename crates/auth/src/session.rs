use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatehouse_core::AccountId;

use crate::token::{digest, random_token};

/// Server-side session record.
///
/// Only the hash of the session token is stored; the cleartext token lives in
/// the client cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token_hash: String,
    pub account_id: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly started session plus the cleartext token to hand to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

impl Session {
    /// Start a session for `account_id` lasting `ttl` from `now`.
    ///
    /// Fails with `InvalidTimeWindow` when `ttl` is not positive or the expiry
    /// falls outside the representable calendar.
    pub fn start(
        account_id: AccountId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IssuedSession, SessionValidationError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .filter(|expires_at| *expires_at > now)
            .ok_or(SessionValidationError::InvalidTimeWindow)?;
        let token = random_token();
        let session = Session {
            token_hash: Self::hash_token(&token),
            account_id,
            issued_at: now,
            expires_at,
        };
        Ok(IssuedSession { token, session })
    }

    /// Storage key for a cleartext session token.
    pub fn hash_token(token: &str) -> String {
        digest(token)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,

    #[error("session not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid session time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a session's time window.
pub fn validate_session(session: &Session, now: DateTime<Utc>) -> Result<(), SessionValidationError> {
    if session.expires_at <= session.issued_at {
        return Err(SessionValidationError::InvalidTimeWindow);
    }
    if now < session.issued_at {
        return Err(SessionValidationError::NotYetValid);
    }
    if now >= session.expires_at {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_session_is_valid_until_expiry() {
        let now = Utc::now();
        let issued = Session::start(AccountId::new(), now, Duration::minutes(30)).unwrap();

        assert_eq!(issued.session.token_hash, Session::hash_token(&issued.token));
        assert_eq!(validate_session(&issued.session, now), Ok(()));
        assert_eq!(
            validate_session(&issued.session, now + Duration::minutes(30)),
            Err(SessionValidationError::Expired)
        );
    }

    #[test]
    fn future_and_inverted_windows_are_rejected() {
        let now = Utc::now();
        let issued = Session::start(AccountId::new(), now, Duration::minutes(5)).unwrap();
        assert_eq!(
            validate_session(&issued.session, now - Duration::seconds(1)),
            Err(SessionValidationError::NotYetValid)
        );

        let mut inverted = issued.session.clone();
        inverted.expires_at = inverted.issued_at;
        assert_eq!(
            validate_session(&inverted, now),
            Err(SessionValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn unrepresentable_lifetimes_are_refused() {
        let now = Utc::now();
        assert_eq!(
            Session::start(AccountId::new(), now, Duration::MAX),
            Err(SessionValidationError::InvalidTimeWindow)
        );
        assert_eq!(
            Session::start(AccountId::new(), now, Duration::zero()),
            Err(SessionValidationError::InvalidTimeWindow)
        );
    }
}
