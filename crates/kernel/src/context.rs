use std::collections::HashMap;

use chrono::{DateTime, Utc};

use gatehouse_core::{DomainError, DomainResult};

/// Form field carrying the echoed anti-forgery token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Ambient, read-only state of one inbound request.
///
/// Built by the transport layer (cookies, headers, form body) and handed to
/// guards and action bodies. Nothing in the kernel mutates it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    fields: HashMap<String, String>,
    submitted_csrf: Option<String>,
    stored_csrf_hash: Option<String>,
    session_token: Option<String>,
    now: DateTime<Utc>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Context evaluated at a fixed instant (session expiry is checked against it).
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            fields: HashMap::new(),
            submitted_csrf: None,
            stored_csrf_hash: None,
            session_token: None,
            now,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Token echoed by the client outside the form body (e.g. a header).
    pub fn with_submitted_csrf(mut self, token: impl Into<String>) -> Self {
        self.submitted_csrf = Some(token.into());
        self
    }

    /// Hash read back from the client-side store (cookie).
    pub fn with_stored_csrf_hash(mut self, hash: impl Into<String>) -> Self {
        self.stored_csrf_hash = Some(hash.into());
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// A form field that must be present and non-blank.
    pub fn require_field(&self, name: &str) -> DomainResult<&str> {
        match self.field(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(DomainError::validation(format!("field '{name}' is required"))),
        }
    }

    /// Submitted anti-forgery token: explicit value first, then the form field.
    pub fn submitted_csrf(&self) -> Option<&str> {
        self.submitted_csrf
            .as_deref()
            .or_else(|| self.field(CSRF_FIELD))
    }

    pub fn stored_csrf_hash(&self) -> Option<&str> {
        self.stored_csrf_hash.as_deref()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_csrf_wins_over_form_field() {
        let ctx = RequestContext::new().with_field(CSRF_FIELD, "from-form");
        assert_eq!(ctx.submitted_csrf(), Some("from-form"));

        let ctx = ctx.with_submitted_csrf("from-header");
        assert_eq!(ctx.submitted_csrf(), Some("from-header"));
    }

    #[test]
    fn blank_required_field_is_a_validation_error() {
        let ctx = RequestContext::new().with_field("title", "   ");
        assert!(matches!(ctx.require_field("title"), Err(DomainError::Validation(_))));
        assert!(ctx.require_field("missing").is_err());
    }

    #[test]
    fn empty_session_token_counts_as_absent() {
        let ctx = RequestContext::new().with_session_token("");
        assert_eq!(ctx.session_token(), None);
    }
}
