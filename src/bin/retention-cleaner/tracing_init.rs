// Initializes the tracing subscriber for the CLI binary.

use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use retention_cleaner::config::TracingConfig;
use retention_cleaner::pipeline::SUMMARY_TARGET;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .compact()
        .with_target(false)
        .with_ansi(!config.disable_color_tracing && std::io::stdout().is_terminal())
        .with_span_events(fmt_span);

    let (event_filter, show_target) = match env::var(EVENT_FILTER_ENV_VAR) {
        Ok(event_filter) => (event_filter, true),
        Err(_) => (default_event_filter(config.tracing_level), false),
    };

    let subscriber_builder = subscriber_builder
        .with_env_filter(event_filter)
        .with_target(show_target);
    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}

// The library and the binary share the crate name. The run summary stays
// visible at any verbosity.
fn default_event_filter(tracing_level: log::Level) -> String {
    format!("retention_cleaner={tracing_level},{SUMMARY_TARGET}=info")
}
