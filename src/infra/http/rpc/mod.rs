//! tRPC-compatible HTTP transport.
//!
//! `GET /trpc/{path}?input=<json>` runs a query, `POST /trpc/{path}` with a
//! JSON body runs a mutation. With `?batch=1` the path is a comma-separated
//! list of procedures and the input is an object keyed by call index; the
//! response is then an array of envelopes in call order.

pub mod error;
pub mod routers;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path, Query, Request, State},
    http::StatusCode,
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::future::join_all;
use leasehold_api_types::{RpcFailure, RpcSuccess};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::context::{ContextBuilder, RpcContext};
use crate::infra::http::RouterState;
use crate::infra::http::middleware::RequestContext;

pub use error::{RpcError, RpcErrorCode};
pub use routers::{AppRouter, ProcedureKind};

pub const METRIC_RPC_CALLS: &str = "leasehold_rpc_calls_total";
pub const METRIC_RPC_CALL_MS: &str = "leasehold_rpc_call_ms";

#[derive(Clone)]
pub struct RpcState {
    pub router: Arc<AppRouter>,
    pub contexts: ContextBuilder,
}

pub fn build_rpc_router(state: RouterState) -> Router<RouterState> {
    let context_state = state.rpc.clone();

    Router::new()
        .route("/trpc/{path}", get(rpc_query).post(rpc_mutation))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            context_state,
            attach_rpc_context,
        ))
}

/// Builds the [`RpcContext`] for the request. The context is also copied to
/// the response so the response logger can report the caller.
pub async fn attach_rpc_context(
    State(state): State<RpcState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let ctx = state.contexts.build(request.headers(), request_id);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RpcQuery {
    input: Option<String>,
    batch: Option<String>,
}

impl RpcQuery {
    fn is_batch(&self) -> bool {
        matches!(self.batch.as_deref(), Some("1" | "true"))
    }
}

async fn rpc_query(
    State(state): State<RpcState>,
    Extension(ctx): Extension<RpcContext>,
    Path(path): Path<String>,
    Query(query): Query<RpcQuery>,
) -> Response {
    let input = match query.input.as_deref().map(parse_json).transpose() {
        Ok(input) => input,
        Err(err) => return err.with_path(path).into_response(),
    };
    dispatch(
        &state.router,
        &ctx,
        &path,
        ProcedureKind::Query,
        query.is_batch(),
        input,
    )
    .await
}

async fn rpc_mutation(
    State(state): State<RpcState>,
    Extension(ctx): Extension<RpcContext>,
    Path(path): Path<String>,
    Query(query): Query<RpcQuery>,
    body: Bytes,
) -> Response {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match std::str::from_utf8(&body) {
            Ok(text) => match parse_json(text) {
                Ok(value) => Some(value),
                Err(err) => return err.with_path(path).into_response(),
            },
            Err(_) => {
                return RpcError::parse_error("Request body is not valid UTF-8")
                    .with_path(path)
                    .into_response();
            }
        }
    };
    dispatch(
        &state.router,
        &ctx,
        &path,
        ProcedureKind::Mutation,
        query.is_batch(),
        input,
    )
    .await
}

fn parse_json(raw: &str) -> Result<Value, RpcError> {
    serde_json::from_str(raw).map_err(|err| RpcError::parse_error(format!("Invalid JSON: {err}")))
}

async fn dispatch(
    router: &AppRouter,
    ctx: &RpcContext,
    path: &str,
    kind: ProcedureKind,
    batch: bool,
    input: Option<Value>,
) -> Response {
    if !batch {
        return match invoke(router, ctx, path, kind, input.unwrap_or(Value::Null)).await {
            Ok(data) => (StatusCode::OK, Json(RpcSuccess::new(data))).into_response(),
            Err(err) => err.into_response(),
        };
    }

    let mut inputs = match input {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return RpcError::bad_request("Batch input must be an object keyed by call index")
                .with_path(path)
                .into_response();
        }
    };

    let calls = path.split(',').enumerate().map(|(index, call_path)| {
        let input = inputs.remove(&index.to_string()).unwrap_or(Value::Null);
        invoke(router, ctx, call_path, kind, input)
    });
    let outcomes = join_all(calls.collect::<Vec<_>>()).await;
    batch_response(outcomes)
}

async fn invoke(
    router: &AppRouter,
    ctx: &RpcContext,
    path: &str,
    kind: ProcedureKind,
    input: Value,
) -> Result<Value, RpcError> {
    let started_at = Instant::now();
    let result = router
        .call(path, kind, ctx, input)
        .await
        .map_err(|err| err.with_path(path));

    // Unknown paths share one label so callers cannot grow the label set.
    let label = if router.resolve(path).is_some() {
        path.to_string()
    } else {
        "unknown".to_string()
    };
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.code.as_str(),
    };
    counter!(METRIC_RPC_CALLS, "path" => label.clone(), "outcome" => outcome).increment(1);
    histogram!(METRIC_RPC_CALL_MS, "path" => label)
        .record(started_at.elapsed().as_secs_f64() * 1000.0);

    result
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchItem {
    Success(RpcSuccess<Value>),
    Failure(RpcFailure),
}

/// 200 when every call succeeds, the shared status when all calls agree,
/// 207 otherwise.
fn batch_status(outcomes: &[Result<Value, RpcError>]) -> StatusCode {
    let mut statuses = outcomes.iter().map(|outcome| match outcome {
        Ok(_) => StatusCode::OK,
        Err(err) => err.status(),
    });
    let Some(first) = statuses.next() else {
        return StatusCode::OK;
    };
    if statuses.all(|status| status == first) {
        first
    } else {
        StatusCode::MULTI_STATUS
    }
}

fn batch_response(outcomes: Vec<Result<Value, RpcError>>) -> Response {
    let status = batch_status(&outcomes);
    let report = outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().err())
        .map(|err| err.report().clone());

    let items: Vec<BatchItem> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(data) => BatchItem::Success(RpcSuccess::new(data)),
            Err(err) => BatchItem::Failure(err.to_failure()),
        })
        .collect();

    let mut response = (status, Json(items)).into_response();
    if let Some(report) = report {
        report.attach(&mut response);
    }
    response
}
