use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header::CACHE_CONTROL};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use leasehold::application::auth::AuthService;
use leasehold::application::blog::BlogService;
use leasehold::application::properties::PropertyService;
use leasehold::application::tokens::TokenService;
use leasehold::application::users::UserService;
use leasehold::infra::http::{RouterState, build_router};
use leasehold::infra::memory::InMemoryRepositories;

fn write_post(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write post");
}

fn post(title: &str, date: &str, body: &str) -> String {
    format!("---\ntitle: {title}\ndatePublished: {date}\n---\n{body}\n")
}

fn service(dir: &Path) -> BlogService {
    BlogService::new(dir, NonZeroUsize::new(2).expect("non-zero"))
}

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write_post(dir.path(), "alpha.md", &post("Alpha", "2023-05-01", "First post."));
    write_post(
        dir.path(),
        "bravo.md",
        &post("Bravo", "2024-01-15T08:30:00Z", "Newest post."),
    );
    write_post(dir.path(), "charlie.md", &post("Charlie", "2023-11-20", "Middle post."));
    write_post(dir.path(), "undated.md", "Just a body without front-matter.\n");
    write_post(dir.path(), "notes.txt", "not a post");
    dir
}

#[tokio::test]
async fn posts_are_sorted_newest_first() {
    let dir = seeded_dir();
    let posts = service(dir.path()).list_posts().await;

    let slugs: Vec<_> = posts.iter().map(|post| post.slug.as_str()).collect();
    assert_eq!(slugs, vec!["bravo", "charlie", "alpha", "undated"]);

    let dated: Vec<_> = posts.iter().filter_map(|post| post.published_at).collect();
    assert!(dated.windows(2).all(|pair| pair[0] > pair[1]));
}

#[tokio::test]
async fn corrupt_post_does_not_abort_the_listing() {
    let dir = seeded_dir();
    write_post(
        dir.path(),
        "broken.md",
        "---\ntitle: [unterminated\n---\nBody.\n",
    );

    let blog = service(dir.path());
    let posts = blog.list_posts().await;
    assert_eq!(posts.len(), 4);
    assert!(posts.iter().all(|post| post.slug != "broken"));
    assert!(blog.get_post("broken").await.is_none());
}

#[tokio::test]
async fn scalar_keywords_do_not_drop_the_post() {
    let dir = TempDir::new().expect("tempdir");
    write_post(
        dir.path(),
        "a.md",
        "---\ntitle: A\ndatePublished: 2024-01-02\nkeywords: rent\n---\nBody.\n",
    );
    write_post(
        dir.path(),
        "b.md",
        "---\ntitle: B\ndatePublished: 2024-01-01\nkeywords: [rent]\n---\nBody.\n",
    );

    let posts = service(dir.path()).list_posts().await;
    let slugs: Vec<_> = posts.iter().map(|post| post.slug.as_str()).collect();
    assert_eq!(slugs, vec!["a", "b"]);
    assert_eq!(posts[0].keywords, vec!["rent"]);
    assert_eq!(posts[1].keywords, vec!["rent"]);
}

#[tokio::test]
async fn empty_or_missing_directory_lists_nothing() {
    let dir = TempDir::new().expect("tempdir");
    assert!(service(dir.path()).list_posts().await.is_empty());
    assert!(
        service(&dir.path().join("missing"))
            .list_posts()
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn get_post_by_slug() {
    let dir = seeded_dir();
    let blog = service(dir.path());

    let alpha = blog.get_post("alpha").await.expect("alpha");
    assert_eq!(alpha.title, "Alpha");
    assert_eq!(alpha.excerpt, "First post....");

    assert!(blog.get_post("missing-slug").await.is_none());
    assert!(blog.get_post("../alpha").await.is_none());
}

#[tokio::test]
async fn cjk_and_latin_excerpts() {
    let dir = TempDir::new().expect("tempdir");
    write_post(
        dir.path(),
        "zh.md",
        &post("指南", "2024-02-02", "# 标题\nRent tips: 押一付三是常见的付款方式。More text."),
    );
    let latin = "Lorem ipsum dolor sit amet. ".repeat(10);
    write_post(dir.path(), "en.md", &post("Guide", "2024-02-01", &latin));

    let blog = service(dir.path());
    let zh = blog.get_post("zh").await.expect("zh");
    assert_eq!(zh.excerpt, "押一付三是常见的付款方式...");

    let en = blog.get_post("en").await.expect("en");
    let expected: String = latin.chars().take(150).collect();
    assert_eq!(en.excerpt, format!("{}...", expected.trim()));
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let cache_control = response
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (
        status,
        cache_control,
        serde_json::from_slice(&bytes).expect("json"),
    )
}

fn app(dir: &Path) -> axum::Router {
    let tokens = Arc::new(TokenService::new(None, Duration::from_secs(60)));
    let repos = Arc::new(InMemoryRepositories::new());
    build_router(RouterState::new(
        tokens.clone(),
        AuthService::new(repos.clone(), tokens),
        PropertyService::new(repos.clone()),
        UserService::new(repos),
        service(dir),
    ))
}

#[tokio::test]
async fn blog_routes_serve_json() {
    let dir = seeded_dir();

    let (status, cache_control, body) = get_json(app(dir.path()), "/api/blog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control.as_deref(), Some("no-store"));
    let posts = body.as_array().expect("array");
    assert_eq!(posts.len(), 4);
    assert_eq!(posts[0]["slug"], "bravo");
    assert_eq!(posts[0]["datePublished"], "2024-01-15T08:30:00Z");
    assert!(posts[0].get("publishedAt").is_none());

    let (status, _, body) = get_json(app(dir.path()), "/api/blog/charlie").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Charlie");
    assert_eq!(body["schema"], serde_json::json!({}));
    assert_eq!(body["keywords"], serde_json::json!([]));

    let (status, _, body) = get_json(app(dir.path()), "/api/blog/missing-slug").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post not found");
}

#[tokio::test]
async fn edits_are_visible_without_restart() {
    let dir = seeded_dir();
    let blog = service(dir.path());
    assert_eq!(blog.list_posts().await.len(), 4);

    write_post(dir.path(), "delta.md", &post("Delta", "2025-01-01", "Fresh."));
    let posts = blog.list_posts().await;
    assert_eq!(posts.len(), 5);
    assert_eq!(posts[0].slug, "delta");
}
