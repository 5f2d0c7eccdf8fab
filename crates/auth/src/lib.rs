//! `gatehouse-auth` — identities, roles, sessions and anti-forgery tokens.
//!
//! This crate is decoupled from HTTP and storage: it defines the values the
//! guard pipeline reasons about and the pure checks over them.

pub mod account;
pub mod authorize;
pub mod csrf;
pub mod password;
pub mod roles;
pub mod session;
mod token;

pub use account::{Account, RoleLink, highest_role};
pub use authorize::{AuthzError, authorize};
pub use csrf::{CsrfError, CsrfToken, verify_csrf};
pub use password::{PasswordError, hash_password, verify_password, verify_placeholder};
pub use roles::{Role, UnknownRole};
pub use session::{IssuedSession, Session, SessionValidationError, validate_session};
