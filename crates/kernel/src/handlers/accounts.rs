//! Account lifecycle: anti-forgery tokens, registration, sign-in, roles, deletion.

use serde_json::json;

use gatehouse_auth::{
    Account, CsrfToken, Role, RoleLink, Session, hash_password, verify_password, verify_placeholder,
};
use gatehouse_core::{DomainError, DomainResult};

use crate::action::{ActionOutcome, ClientEffect, GuardedAction};
use crate::context::RequestContext;
use crate::error::{ActionResult, HandleError};
use crate::guard::{Guard, current_session};
use crate::handler::Handler;
use crate::hooks::HookRegistry;
use crate::settings::Settings;
use crate::store::{SessionLookup, Storage};

pub const MIN_PASSWORD_LEN: usize = 8;
const USERNAME_LEN: core::ops::RangeInclusive<usize> = 3..=32;

const ACTIONS: &[&str] = &[
    "csrf-token",
    "register",
    "login",
    "logout",
    "change-password",
    "delete-account",
    "grant-role",
    "revoke-role",
];

pub struct AccountsHandler<'a, S: 'static> {
    store: &'a S,
    hooks: &'a HookRegistry<S>,
    settings: &'a Settings,
}

impl<'a, S: Storage + 'static> AccountsHandler<'a, S> {
    pub fn new(store: &'a S, hooks: &'a HookRegistry<S>, settings: &'a Settings) -> Self {
        Self {
            store,
            hooks,
            settings,
        }
    }

    fn csrf_token(&self, _ctx: &RequestContext) -> ActionResult {
        let pair = CsrfToken::issue();
        Ok(ActionOutcome::json(json!({ "csrf_token": pair.token() }))
            .with_effect(ClientEffect::IssueCsrf(pair)))
    }

    fn register(&self, ctx: &RequestContext) -> ActionResult {
        let username = validate_username(ctx.require_field("username")?)?;
        let password = validate_password(ctx.require_field("password")?)?;
        let account = Account::new(username, hash_password(password)?, ctx.now());

        let roles = self.store.atomically(|store| -> Result<Vec<Role>, HandleError> {
            if store.find_account_by_username(&account.username)?.is_some() {
                return Err(DomainError::conflict(format!(
                    "username '{}' is taken",
                    account.username
                ))
                .into());
            }

            // The very first account bootstraps administration.
            let mut roles = vec![Role::Member];
            if store.count_accounts()? == 0 {
                roles.push(Role::Admin);
            }

            store.insert_account(account.clone())?;
            for role in &roles {
                store.insert_role_link(RoleLink::new(account.id, *role))?;
            }
            Ok(roles)
        })?;

        tracing::info!(account_id = %account.id, username = %account.username, ?roles, "account registered");
        Ok(ActionOutcome::json(json!({
            "account_id": account.id,
            "username": account.username,
            "roles": roles,
        })))
    }

    fn login(&self, ctx: &RequestContext) -> ActionResult {
        let username = normalize_username(ctx.require_field("username")?);
        let password = ctx.require_field("password")?;

        let Some(account) = self.store.find_account_by_username(&username)? else {
            verify_placeholder(password);
            return Err(DomainError::InvalidCredentials.into());
        };
        if !verify_password(password, &account.password_hash)? {
            tracing::info!(account_id = %account.id, "login rejected");
            return Err(DomainError::InvalidCredentials.into());
        }

        let issued = Session::start(account.id, ctx.now(), self.settings.session_ttl)?;
        let expires_at = issued.session.expires_at;
        self.store.insert_session(issued.session)?;

        let csrf = CsrfToken::issue();
        tracing::info!(account_id = %account.id, %expires_at, "session started");
        Ok(ActionOutcome::json(json!({
            "account_id": account.id,
            "expires_at": expires_at,
            "csrf_token": csrf.token(),
        }))
        .with_effect(ClientEffect::StartSession {
            token: issued.token,
            expires_at,
        })
        .with_effect(ClientEffect::IssueCsrf(csrf)))
    }

    fn logout(&self, ctx: &RequestContext) -> ActionResult {
        let session = current_session(ctx, self.store)?;
        self.store.delete_session(&session.token_hash)?;

        let csrf = CsrfToken::issue();
        tracing::info!(account_id = %session.account_id, "session ended");
        Ok(ActionOutcome::json(json!({ "ok": true, "csrf_token": csrf.token() }))
            .with_effect(ClientEffect::EndSession)
            .with_effect(ClientEffect::IssueCsrf(csrf)))
    }

    fn change_password(&self, ctx: &RequestContext) -> ActionResult {
        let session = current_session(ctx, self.store)?;
        let current = ctx.require_field("current_password")?;
        let replacement = validate_password(ctx.require_field("new_password")?)?;

        let account = self.acting_account(&session)?;
        if !verify_password(current, &account.password_hash)? {
            return Err(DomainError::InvalidCredentials.into());
        }
        let replacement_hash = hash_password(replacement)?;

        // A new password ends every other session of the account.
        let ended = self.store.atomically(|store| -> Result<usize, HandleError> {
            let mut latest = store
                .find_account(account.id)?
                .ok_or_else(|| DomainError::not_found(format!("account {}", account.id)))?;
            if latest.password_hash != account.password_hash {
                return Err(DomainError::conflict("password was changed concurrently").into());
            }
            latest.password_hash = replacement_hash;
            store.update_account(latest)?;
            let others: Vec<Session> = store
                .sessions_for(account.id)?
                .into_iter()
                .filter(|s| s.token_hash != session.token_hash)
                .collect();
            for other in &others {
                store.delete_session(&other.token_hash)?;
            }
            Ok(others.len())
        })?;

        tracing::info!(account_id = %account.id, ended, "password changed");
        Ok(ActionOutcome::json(json!({ "ok": true, "sessions_ended": ended })))
    }

    fn delete_account(&self, ctx: &RequestContext) -> ActionResult {
        let session = current_session(ctx, self.store)?;
        let password = ctx.require_field("password")?;

        let account = self.acting_account(&session)?;
        if !verify_password(password, &account.password_hash)? {
            return Err(DomainError::InvalidCredentials.into());
        }

        self.hooks
            .delete(self.store, &account, |store, account| store.delete_account(account.id))?;

        Ok(ActionOutcome::json(json!({ "deleted": account.id })).with_effect(ClientEffect::EndSession))
    }

    fn grant_role(&self, ctx: &RequestContext) -> ActionResult {
        let (account, role) = self.role_target(ctx)?;

        let granted = self.store.atomically(|store| -> Result<bool, HandleError> {
            let held = store.role_links_for(account.id)?.iter().any(|l| l.role == role);
            if !held {
                store.insert_role_link(RoleLink::new(account.id, role))?;
            }
            Ok(!held)
        })?;
        if granted {
            tracing::info!(account_id = %account.id, %role, "role granted");
        }

        Ok(ActionOutcome::json(json!({
            "username": account.username,
            "role": role,
            "granted": granted,
        })))
    }

    fn revoke_role(&self, ctx: &RequestContext) -> ActionResult {
        let acting = current_session(ctx, self.store)?;
        let (account, role) = self.role_target(ctx)?;

        if role == Role::Admin && account.id == acting.account_id {
            return Err(DomainError::validation("administrators cannot revoke their own admin role").into());
        }

        let revoked = self.store.atomically(|store| -> Result<usize, HandleError> {
            let matching: Vec<RoleLink> = store
                .role_links_for(account.id)?
                .into_iter()
                .filter(|l| l.role == role)
                .collect();
            for link in &matching {
                store.delete_role_link(link.id)?;
            }
            Ok(matching.len())
        })?;

        if revoked > 0 {
            tracing::info!(account_id = %account.id, %role, "role revoked");
        }
        Ok(ActionOutcome::json(json!({
            "username": account.username,
            "role": role,
            "revoked": revoked,
        })))
    }

    fn acting_account(&self, session: &Session) -> Result<Account, HandleError> {
        Ok(self
            .store
            .find_account(session.account_id)?
            .ok_or_else(|| DomainError::not_found(format!("account {}", session.account_id)))?)
    }

    fn role_target(&self, ctx: &RequestContext) -> Result<(Account, Role), HandleError> {
        let username = normalize_username(ctx.require_field("username")?);
        let role: Role = ctx
            .require_field("role")?
            .parse()
            .map_err(|e: gatehouse_auth::UnknownRole| DomainError::validation(e.to_string()))?;
        let account = self
            .store
            .find_account_by_username(&username)?
            .ok_or_else(|| DomainError::not_found(format!("account '{username}'")))?;
        Ok((account, role))
    }
}

impl<S: Storage + 'static> Handler for AccountsHandler<'_, S> {
    fn area(&self) -> &'static str {
        "accounts"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn route(&self, name: &str) -> Option<GuardedAction<'_>> {
        let action = match name {
            "csrf-token" => GuardedAction::builder("csrf-token")
                .run(move |ctx: &RequestContext| self.csrf_token(ctx)),
            "register" => GuardedAction::builder("register")
                .guard(Guard::token())
                .run(move |ctx: &RequestContext| self.register(ctx)),
            "login" => GuardedAction::builder("login")
                .guard(Guard::token())
                .run(move |ctx: &RequestContext| self.login(ctx)),
            "logout" => GuardedAction::builder("logout")
                .guard(Guard::token())
                .guard(Guard::session())
                .run(move |ctx: &RequestContext| self.logout(ctx)),
            "change-password" => GuardedAction::builder("change-password")
                .guard(Guard::token())
                .guard(Guard::session())
                .run(move |ctx: &RequestContext| self.change_password(ctx)),
            "delete-account" => GuardedAction::builder("delete-account")
                .guard(Guard::token())
                .guard(Guard::session())
                .run(move |ctx: &RequestContext| self.delete_account(ctx)),
            "grant-role" => GuardedAction::builder("grant-role")
                .guard(Guard::token())
                .guard(Guard::session_with(Role::Admin))
                .run(move |ctx: &RequestContext| self.grant_role(ctx)),
            "revoke-role" => GuardedAction::builder("revoke-role")
                .guard(Guard::token())
                .guard(Guard::session_with(Role::Admin))
                .run(move |ctx: &RequestContext| self.revoke_role(ctx)),
            _ => return None,
        };
        Some(action)
    }

    fn sessions(&self) -> &dyn SessionLookup {
        self.store
    }
}

/// Usernames are compared trimmed and lowercased.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_username(raw: &str) -> DomainResult<String> {
    let username = normalize_username(raw);
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(DomainError::validation(format!(
            "username must be {}-{} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DomainError::validation(
            "username may only contain a-z, 0-9, '_', '.' and '-'",
        ));
    }
    Ok(username)
}

pub fn validate_password(raw: &str) -> DomainResult<&str> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_normalized_and_checked() {
        assert_eq!(validate_username("  Alice_01 ").unwrap(), "alice_01");
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert_eq!(validate_password("long enough"), Ok("long enough"));
    }
}
