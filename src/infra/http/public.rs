use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{blog::BlogService, error::HttpError};

use super::RouterState;

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
}

pub fn build_public_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/api/blog", get(list_posts))
        .route("/api/blog/{slug}", get(get_post))
        .route("/_health", get(health))
        .with_state(state)
}

async fn list_posts(State(state): State<HttpState>) -> Response {
    let mut response = Json(state.blog.list_posts().await).into_response();
    set_no_store(&mut response);
    response
}

async fn get_post(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.blog.get_post(&slug).await {
        Some(post) => {
            let mut response = Json(post).into_response();
            set_no_store(&mut response);
            response
        }
        None => HttpError::new(
            "infra::http::public::get_post",
            StatusCode::NOT_FOUND,
            "Post not found",
            format!("no readable post for slug `{slug}`"),
        )
        .into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Posts are read from disk on every request; intermediaries must not cache them.
fn set_no_store(response: &mut Response) {
    let value = HeaderValue::from_static("no-store");
    response.headers_mut().insert(CACHE_CONTROL, value);
}
