use std::{process, sync::Arc, time::Duration};

use leasehold::{
    application::{
        auth::AuthService, blog::BlogService, error::AppError, properties::PropertyService,
        tokens::TokenService, users::UserService,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, RouterState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Posts(args) => run_posts(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let tokens = Arc::new(TokenService::from_settings(&settings.auth));
    if !tokens.is_configured() {
        warn!(
            target = "leasehold::startup",
            env = config::JWT_SECRET_ENV,
            "no token secret configured; every caller is anonymous and sign-in is disabled"
        );
    }

    let repositories = Arc::new(InMemoryRepositories::new());
    let state = RouterState::new(
        tokens.clone(),
        AuthService::new(repositories.clone(), tokens),
        PropertyService::new(repositories.clone()),
        UserService::new(repositories),
        BlogService::from_settings(&settings.blog),
    );

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "leasehold::startup",
        addr = %settings.server.addr,
        blog_directory = %settings.blog.directory.display(),
        "listening"
    );

    let (draining_tx, draining_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = drain_deadline(draining_rx, grace) => {
            warn!(
                target = "leasehold::shutdown",
                grace_seconds = grace.as_secs(),
                "in-flight requests did not finish in time"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "leasehold::shutdown", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "leasehold::shutdown", "shutdown requested, draining connections");
}

/// Resolves `grace` after draining started; never resolves if it did not.
async fn drain_deadline(draining: oneshot::Receiver<()>, grace: Duration) {
    if draining.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

async fn run_posts(settings: config::Settings, args: config::PostsArgs) -> Result<(), AppError> {
    let blog = BlogService::from_settings(&settings.blog);
    let posts = blog.list_posts().await;

    if args.json {
        let rendered = serde_json::to_string_pretty(&posts)
            .map_err(|err| AppError::unexpected(format!("failed to encode posts: {err}")))?;
        println!("{rendered}");
        return Ok(());
    }

    info!(
        target = "leasehold::posts",
        directory = %blog.directory().display(),
        count = posts.len(),
        "listed blog posts"
    );
    for post in &posts {
        let date = if post.date_published.is_empty() {
            "-"
        } else {
            post.date_published.as_str()
        };
        println!("{:<12}  {:<40}  {}", date, post.slug, post.title);
    }
    Ok(())
}
