//! Action dispatch: picks the custom handler or the default CRUD behaviour for a
//! resolved route, after the permit check.

use crate::context::Context;
use crate::error::{AppError, ErrorKind};
use crate::params::Params;
use crate::resource::Action;
use crate::router::Route;

/// Run `action` against `route`. The returned context holds what should be rendered.
pub async fn dispatch(route: Route<'_>, action: Action, params: Params) -> Result<Context, AppError> {
    let entry = route.actions().get(action).cloned().ok_or_else(|| {
        AppError::with_message(
            ErrorKind::NotImplemented,
            format!("{} is not implemented for {}", action.as_str(), route.resource.name()),
        )
    })?;
    entry.options().check(&params)?;

    let collection_name = route.collection_name().map(str::to_string);
    let member_name = route.member_name().map(str::to_string);
    let ctx = Context::new(route.resource, route.scope.helpers().clone(), params).with_target(
        route.id,
        route.record,
        collection_name,
        member_name,
    );

    match entry.handler() {
        Some(handler) => {
            tracing::debug!(resource = ctx.resource().name(), action = action.as_str(), "custom action");
            handler(ctx).await
        }
        None => {
            tracing::debug!(resource = ctx.resource().name(), action = action.as_str(), "default action");
            default_action(action, ctx).await
        }
    }
}

async fn default_action(action: Action, mut ctx: Context) -> Result<Context, AppError> {
    let model = ctx.model().clone();
    match action {
        Action::Create => {
            let record = model.create(ctx.params()).await?;
            if !record.has_errors() {
                ctx.created();
            }
            ctx.set_record(record);
        }
        Action::Show => {
            if ctx.record().is_none() {
                let records = model.all().await?;
                ctx.set_records(records);
            }
        }
        Action::Update => {
            let id = ctx.require_id()?.to_string();
            // The key in the path wins over one in the payload.
            let mut params = ctx.params().clone();
            params.remove(model.primary_key());
            let record = model.update(&id, &params).await?;
            ctx.set_record(record);
        }
        Action::Destroy => {
            let id = ctx.require_id()?.to_string();
            let record = ctx.take_record()?;
            model.delete(&id).await?;
            ctx.set_record(record);
        }
    }
    Ok(ctx)
}
