use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::{AccountId, Entity, RoleLinkId};

use crate::Role;

/// A registered account.
///
/// Role membership is not stored here: it lives in [`RoleLink`] join records
/// owned by the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// PHC-formatted argon2 hash.
    pub password_hash: String,
    /// Preferred language code, if one was chosen while signed in.
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            username: username.into(),
            password_hash: password_hash.into(),
            language: None,
            created_at: now,
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    const ENTITY_TYPE: &'static str = "account";

    fn id(&self) -> &AccountId {
        &self.id
    }
}

/// Join record granting a role to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLink {
    pub id: RoleLinkId,
    pub account_id: AccountId,
    pub role: Role,
}

impl RoleLink {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self {
            id: RoleLinkId::new(),
            account_id,
            role,
        }
    }
}

impl Entity for RoleLink {
    type Id = RoleLinkId;

    const ENTITY_TYPE: &'static str = "role_link";

    fn id(&self) -> &RoleLinkId {
        &self.id
    }
}

/// Highest role among `roles`, if any.
pub fn highest_role<'a>(roles: impl IntoIterator<Item = &'a Role>) -> Option<Role> {
    roles.into_iter().copied().max()
}
