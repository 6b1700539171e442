//! Handler argument resolution.
//!
//! Walks an action's [`ParamSpec`] list against the matched captures:
//!
//! - the request is passed through
//! - `params` receives every capture
//! - records are looked up by route key (route-model binding)
//! - services come from the container
//! - scalars come from the capture of the same name, else the default

use http::Method;
use serde_json::Value;
use tracing::debug;
use velolia_container::{Argument, Arguments, Container};
use velolia_core::{RecordStore, Request, VeloliaError, VeloliaResult};

use crate::action::{HandlerArgs, ParamSpec};
use crate::captures::Captures;

/// What the resolver needs besides the request.
pub(crate) struct BindingContext<'a> {
    pub(crate) container: &'a Container,
    pub(crate) store: Option<&'a dyn RecordStore>,
}

pub(crate) async fn bind_arguments(
    params: &[ParamSpec],
    request: Request,
    captures: Captures,
    ctx: BindingContext<'_>,
) -> VeloliaResult<HandlerArgs> {
    let method = request.method().clone();
    let path = request.path().to_string();
    let mut arguments = Arguments::new();
    let mut wants_request = false;

    for param in params {
        match param {
            ParamSpec::Request => wants_request = true,
            ParamSpec::Captures => {
                arguments.push(
                    crate::action::CAPTURES_PARAMETER,
                    Argument::value(Value::Object(captures.to_map())),
                );
            }
            ParamSpec::Record {
                name,
                table,
                key,
                optional,
                decode,
            } => {
                let Some(value) = captures.get(name).or_else(|| captures.sole()) else {
                    if *optional {
                        arguments.push(name.clone(), Argument::value(Value::Null));
                        continue;
                    }
                    return Err(VeloliaError::missing_parameter(name.clone()));
                };

                let record = find_record(&ctx, table, key, value, &method, &path).await?;
                arguments.push(name.clone(), Argument::Instance(decode(record)?));
            }
            ParamSpec::Service { name, id, class } => {
                if let Some(class) = class {
                    ctx.container.define(*class);
                }
                arguments.push(name.clone(), Argument::Instance(ctx.container.make(id)?));
            }
            ParamSpec::Scalar { name, default } => {
                let value = match (captures.get(name), default) {
                    (Some(captured), _) => Value::String(captured.to_string()),
                    (None, Some(default)) => default.clone(),
                    (None, None) => return Err(VeloliaError::missing_parameter(name.clone())),
                };
                arguments.push(name.clone(), Argument::value(value));
            }
        }
    }

    let request = wants_request.then_some(request);
    Ok(HandlerArgs::new(request, captures, arguments))
}

async fn find_record(
    ctx: &BindingContext<'_>,
    table: &str,
    key: &str,
    value: &str,
    method: &Method,
    path: &str,
) -> VeloliaResult<velolia_core::Row> {
    let Some(store) = ctx.store else {
        return Err(VeloliaError::internal(format!(
            "route-model binding for table {table} needs a record store"
        )));
    };

    debug!(table, key, value, "binding route record");
    store
        .find_first(table, key, value)
        .await?
        .ok_or_else(|| VeloliaError::route_not_found(method, path))
}
