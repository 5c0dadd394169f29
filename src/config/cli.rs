use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Leasehold binary.
#[derive(Debug, Parser)]
#[command(name = "leasehold", version, about = "Leasehold listing backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LEASEHOLD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Print the blog index as the server would list it.
    Posts(PostsArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BlogOverrides {
    /// Override the directory holding `*.md` blog posts.
    #[arg(long = "blog-directory", value_name = "PATH")]
    pub blog_directory: Option<PathBuf>,

    /// Override how many post files are read at once.
    #[arg(long = "blog-read-concurrency", value_name = "COUNT")]
    pub blog_read_concurrency: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub blog: BlogOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the lifetime of issued access tokens.
    #[arg(long = "auth-token-ttl-seconds", value_name = "SECONDS")]
    pub auth_token_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PostsArgs {
    #[command(flatten)]
    pub blog: BlogOverrides,

    /// Emit the full posts as JSON instead of a table.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}
