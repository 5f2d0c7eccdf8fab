use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::{AccountId, DomainError, DomainResult, Entity, RecordId};

pub const MAX_TITLE_LEN: usize = 200;

/// A managed record, owned by the account that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner: AccountId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(owner: AccountId, title: &str, body: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: RecordId::new(),
            owner,
            title: validate_title(title)?,
            body: body.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl Entity for Record {
    type Id = RecordId;

    const ENTITY_TYPE: &'static str = "record";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

pub fn validate_title(title: &str) -> DomainResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}
