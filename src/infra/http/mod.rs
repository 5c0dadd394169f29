mod middleware;
mod public;
pub mod rpc;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
};

pub use middleware::RequestContext;
pub use public::HttpState;
pub use rpc::{AppRouter, RpcState};

use crate::application::{
    auth::AuthService, blog::BlogService, context::ContextBuilder, error::HttpError,
    properties::PropertyService, tokens::TokenService, users::UserService,
};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub rpc: RpcState,
}

impl RouterState {
    /// Wire services into the per-surface states.
    pub fn new(
        tokens: Arc<TokenService>,
        auth: AuthService,
        properties: PropertyService,
        users: UserService,
        blog: BlogService,
    ) -> Self {
        Self {
            http: HttpState {
                blog: Arc::new(blog),
            },
            rpc: RpcState {
                router: Arc::new(AppRouter::new(auth, properties, users)),
                contexts: ContextBuilder::new(tokens),
            },
        }
    }
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for RpcState {
    fn from_ref(state: &RouterState) -> Self {
        state.rpc.clone()
    }
}

/// The complete HTTP application: RPC, blog and health routes behind the
/// request-id and response-logging layers.
pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .merge(rpc::build_rpc_router(state.clone()))
        .merge(public::build_public_router(state.clone()))
        .fallback(not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn not_found() -> Response {
    HttpError::new(
        "infra::http::fallback",
        StatusCode::NOT_FOUND,
        "Not found",
        "no route matched",
    )
    .into_response()
}
