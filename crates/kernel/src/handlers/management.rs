//! Editorial record management.

use serde_json::json;

use gatehouse_auth::Role;
use gatehouse_core::{DomainError, RecordId};

use crate::action::{ActionOutcome, GuardedAction};
use crate::context::RequestContext;
use crate::error::{ActionResult, HandleError};
use crate::guard::{Guard, current_session};
use crate::handler::Handler;
use crate::hooks::HookRegistry;
use crate::record::{Record, validate_title};
use crate::store::{RecordStore, SessionLookup, Storage};

const ACTIONS: &[&str] = &["list-records", "create-record", "update-record", "delete-record"];

pub struct ManagementHandler<'a, S: 'static> {
    store: &'a S,
    hooks: &'a HookRegistry<S>,
}

impl<'a, S: Storage + 'static> ManagementHandler<'a, S> {
    pub fn new(store: &'a S, hooks: &'a HookRegistry<S>) -> Self {
        Self { store, hooks }
    }

    fn list_records(&self, _ctx: &RequestContext) -> ActionResult {
        let mut records = self.store.list_records()?;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(ActionOutcome::json(json!({ "records": records })))
    }

    fn create_record(&self, ctx: &RequestContext) -> ActionResult {
        let session = current_session(ctx, self.store)?;
        let record = Record::new(
            session.account_id,
            ctx.require_field("title")?,
            ctx.field("body").unwrap_or_default(),
            ctx.now(),
        )?;
        self.store.insert_record(record.clone())?;

        tracing::info!(record_id = %record.id, owner = %record.owner, "record created");
        Ok(ActionOutcome::json(json!({ "record": record })))
    }

    fn update_record(&self, ctx: &RequestContext) -> ActionResult {
        let id = record_id(ctx)?;
        let title = ctx.field("title").map(validate_title).transpose()?;

        let record = self.store.atomically(|store| -> Result<Record, HandleError> {
            let mut record = find_record(store, id)?;
            if let Some(title) = &title {
                record.title = title.clone();
            }
            if let Some(body) = ctx.field("body") {
                record.body = body.to_string();
            }
            record.updated_at = ctx.now();
            store.update_record(record.clone())?;
            Ok(record)
        })?;

        tracing::info!(record_id = %record.id, "record updated");
        Ok(ActionOutcome::json(json!({ "record": record })))
    }

    fn delete_record(&self, ctx: &RequestContext) -> ActionResult {
        let record = self.existing_record(ctx)?;
        self.hooks
            .delete(self.store, &record, |store, record| store.delete_record(record.id))?;
        Ok(ActionOutcome::json(json!({ "deleted": record.id })))
    }

    fn existing_record(&self, ctx: &RequestContext) -> Result<Record, HandleError> {
        find_record(self.store, record_id(ctx)?)
    }
}

fn record_id(ctx: &RequestContext) -> Result<RecordId, HandleError> {
    Ok(ctx.require_field("id")?.trim().parse()?)
}

fn find_record<S: RecordStore>(store: &S, id: RecordId) -> Result<Record, HandleError> {
    Ok(store
        .find_record(id)?
        .ok_or_else(|| DomainError::not_found(format!("record {id}")))?)
}

impl<S: Storage + 'static> Handler for ManagementHandler<'_, S> {
    fn area(&self) -> &'static str {
        "records"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn route(&self, name: &str) -> Option<GuardedAction<'_>> {
        let action = match name {
            "list-records" => GuardedAction::builder("list-records")
                .guard(Guard::session_with(Role::Editor))
                .run(move |ctx: &RequestContext| self.list_records(ctx)),
            "create-record" => GuardedAction::builder("create-record")
                .guard(Guard::token())
                .guard(Guard::session_with(Role::Editor))
                .run(move |ctx: &RequestContext| self.create_record(ctx)),
            "update-record" => GuardedAction::builder("update-record")
                .guard(Guard::token())
                .guard(Guard::session_with(Role::Editor))
                .run(move |ctx: &RequestContext| self.update_record(ctx)),
            "delete-record" => GuardedAction::builder("delete-record")
                .guard(Guard::token())
                .guard(Guard::session_with(Role::Admin))
                .run(move |ctx: &RequestContext| self.delete_record(ctx)),
            _ => return None,
        };
        Some(action)
    }

    fn sessions(&self) -> &dyn SessionLookup {
        self.store
    }
}
