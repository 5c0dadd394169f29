//! Process-wide tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::blog::METRIC_BLOG_READ_FAILURES;
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::rpc::{METRIC_RPC_CALL_MS, METRIC_RPC_CALLS};

use super::error::InfraError;

// Connection-level chatter from the server stack is capped at warn.
const QUIET_DIRECTIVES: [&str; 2] = ["hyper=warn", "h2=warn"];

static METRIC_DESCRIPTIONS: Once = Once::new();

pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let mut env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();
    for directive in QUIET_DIRECTIVES {
        let directive = directive
            .parse()
            .map_err(|err| InfraError::telemetry(format!("bad directive `{directive}`: {err}")))?;
        env_filter = env_filter.add_directive(directive);
    }

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(output)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_RPC_CALLS,
            Unit::Count,
            "Procedure calls by path and outcome code."
        );
        describe_histogram!(
            METRIC_RPC_CALL_MS,
            Unit::Milliseconds,
            "Procedure latency by path."
        );
        describe_counter!(
            METRIC_BLOG_READ_FAILURES,
            Unit::Count,
            "Blog directory or post files that could not be read or parsed."
        );
    });
}
