//! Anti-forgery tokens (double-submit with a hashed cookie).
//!
//! The cleartext token goes into the rendered form; only its hash goes into
//! the client cookie. Nothing is kept server-side: a request is accepted when
//! the hash of the echoed token equals the cookie value.

use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

use gatehouse_core::ValueObject;

use crate::token::{digest, random_token};

/// Issued token pair. `cookie_value == hash(token)` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrfToken {
    token: String,
    cookie_value: String,
}

impl ValueObject for CsrfToken {}

impl CsrfToken {
    /// Issue a fresh pair. Every form render gets its own pair.
    pub fn issue() -> Self {
        let token = random_token();
        let cookie_value = Self::hash(&token);
        Self { token, cookie_value }
    }

    /// Hash applied to a cleartext token before it is stored client-side.
    pub fn hash(token: &str) -> String {
        digest(token)
    }

    /// Cleartext token to embed in the next state-changing request.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Hash to store in the client cookie.
    pub fn cookie_value(&self) -> &str {
        &self.cookie_value
    }

    /// Verify this pair as if it were echoed back unchanged.
    pub fn verify(&self) -> Result<(), CsrfError> {
        verify_csrf(Some(&self.token), Some(&self.cookie_value))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    #[error("anti-forgery token missing")]
    Missing,

    #[error("anti-forgery token mismatch")]
    Mismatch,
}

/// Verify a submitted token against the stored hash.
///
/// Empty values count as absent. The comparison is constant-time.
pub fn verify_csrf(submitted: Option<&str>, stored_hash: Option<&str>) -> Result<(), CsrfError> {
    let submitted = submitted.filter(|s| !s.is_empty()).ok_or(CsrfError::Missing)?;
    let stored_hash = stored_hash.filter(|s| !s.is_empty()).ok_or(CsrfError::Missing)?;

    let computed = CsrfToken::hash(submitted);
    if bool::from(computed.as_bytes().ct_eq(stored_hash.as_bytes())) {
        Ok(())
    } else {
        Err(CsrfError::Mismatch)
    }
}
