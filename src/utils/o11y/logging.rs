//! Logging utilities.
use tracing::Subscriber;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, EnvFilter, Layer};

/// The error type returned when building a subscriber.
#[derive(Debug, thiserror::Error)]
pub enum BuildSubscriberError {
    #[error("failed to parse filtering directive")]
    Parse(#[from] tracing_subscriber::filter::ParseError),
}

/// Build a tracing subscriber.
///
/// The filter is read from `RUST_LOG` and falls back to `info`. Span close
/// events are emitted so the timing of each instrumented stage (table loading,
/// correction, selection) shows up in the log.
pub fn build_subscriber() -> Result<impl Subscriber + Send + Sync, BuildSubscriberError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    Ok(tracing_subscriber::registry().with(fmt_layer.with_filter(env_filter)))
}

/// Log an error at the ERROR level, including its source chain.
pub fn log_error<E: std::error::Error>(err: &E, msg: &str) {
    let mut chain = String::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    tracing::error!(error = %err, "{}{}", msg, chain);
}

/// Build a closure for `Result::inspect_err` that logs the error with a
/// message.
///
/// ```ignore
/// let table = read_table(path).inspect_err(as_error!("failed to read table"))?;
/// ```
macro_rules! as_error {
    ($msg:literal) => {
        |err| $crate::utils::o11y::logging::log_error(err, $msg)
    };
}

pub(crate) use as_error;
