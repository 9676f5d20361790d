use crate::config::{
    Config, DEFAULT_CANDIDATE_QUEUE_SIZE, DEFAULT_LOG_EVERY, DEFAULT_RATE_LIMIT_DELETIONS,
    DEFAULT_ROOT, TracingConfig, default_worker_size,
};
use crate::retention::RetentionPolicy;
use chrono::{DateTime, Utc};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::ffi::OsString;
use std::path::PathBuf;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG_PATH: &str = "./config.json";
const DEFAULT_EXECUTE: bool = false;
const DEFAULT_SHOW_NO_PROGRESS: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_WARN_AS_ERROR: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_WORKER_SIZE_ZERO: &str = "Worker size must be at least 1.";
const ERROR_MESSAGE_QUEUE_SIZE_ZERO: &str = "Candidate queue size must be at least 1.";
const ERROR_MESSAGE_INVALID_TENANT: &str =
    "Tenant must be a single directory name (no path separators, '.' or '..').";

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// retention-cleaner - Removes expired minute directories from a
/// time-partitioned data tree.
///
/// Walks <root>/<tenant>/<device>/<year>/<month>/<day>/<hour>/<minute>
/// and removes every minute directory older than the tenant's retention
/// window. Runs in dry-run mode unless --execute is given.
///
/// Example:
///   retention-cleaner --root /data --config ./config.json
///   retention-cleaner --root /data --execute --deletes-per-sec 50
///   retention-cleaner --root /data --tenant 1001 --execute -q
#[derive(Parser, Clone, Debug)]
#[command(name = "retention-cleaner", version, about, long_about = None)]
pub struct CLIArgs {
    // -----------------------------------------------------------------------
    // General options
    // -----------------------------------------------------------------------
    /// Data root directory.
    #[arg(long, env, default_value = DEFAULT_ROOT, help_heading = "General")]
    pub root: PathBuf,

    /// Path to the retention policy (JSON).
    #[arg(
        long,
        env = "RETENTION_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help_heading = "General",
        long_help = r#"Path to the retention policy file.
Example: {"retention": {"default": 30, "1001": 60}}
The "default" entry is mandatory."#
    )]
    pub config: PathBuf,

    /// Actually remove directories. Without this flag the run is a dry-run.
    #[arg(long, env, default_value_t = DEFAULT_EXECUTE, help_heading = "General")]
    pub execute: bool,

    /// Only process this tenant directory.
    #[arg(
        long,
        env,
        visible_alias = "company",
        value_parser = NonEmptyStringValueParser::new(),
        help_heading = "General"
    )]
    pub tenant: Option<String>,

    /// Reference time for retention cutoffs (RFC 3339). Default: now.
    #[arg(
        long,
        env,
        help_heading = "General",
        long_help = r#"Reference time used to compute every cutoff in the run (RFC3339 datetime).
Defaults to the current time, captured once at startup.
Example: 2024-06-01T00:00:00Z"#
    )]
    pub reference_time: Option<DateTime<Utc>>,

    /// Don't show the progress bar.
    #[arg(long, env, default_value_t = DEFAULT_SHOW_NO_PROGRESS, help_heading = "General")]
    pub show_no_progress: bool,

    // -----------------------------------------------------------------------
    // Performance options
    // -----------------------------------------------------------------------
    /// Number of concurrent deletion workers. Default: min(4, CPUs).
    #[arg(
        long = "workers",
        env = "WORKERS",
        visible_alias = "worker-size",
        default_value_t = default_worker_size(),
        help_heading = "Performance"
    )]
    pub worker_size: u16,

    /// Maximum deletions per second across all workers. 0 means unlimited.
    #[arg(long, env, default_value_t = DEFAULT_RATE_LIMIT_DELETIONS, help_heading = "Performance")]
    pub deletes_per_sec: u32,

    /// Capacity of the queue between the walker and the workers.
    #[arg(long, env, default_value_t = DEFAULT_CANDIDATE_QUEUE_SIZE, help_heading = "Performance")]
    pub queue_size: u32,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (normal), -v, -vv.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Log a progress line every N scanned minute directories. 0 disables.
    #[arg(long, env, default_value_t = DEFAULT_LOG_EVERY, help_heading = "Logging")]
    pub log_every: u64,

    /// Output logs in JSON format.
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable tracing span events.
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Advanced options
    // -----------------------------------------------------------------------
    /// Exit with code 3 when any warning occurred (walk or deletion errors).
    #[arg(long, env, default_value_t = DEFAULT_WARN_AS_ERROR, help_heading = "Advanced")]
    pub warn_as_error: bool,

    /// Generate shell completions.
    #[arg(long, env, help_heading = "Advanced")]
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use retention_cleaner::config::args::parse_from_args;
///
/// let args = vec!["retention-cleaner", "--root", "/srv/data", "--execute"];
/// let cli_args = parse_from_args(args).unwrap();
/// assert!(cli_args.execute);
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
///
/// Loads the retention policy named by `--config`.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if self.worker_size == 0 {
            return Err(ERROR_MESSAGE_WORKER_SIZE_ZERO.to_string());
        }
        if self.queue_size == 0 {
            return Err(ERROR_MESSAGE_QUEUE_SIZE_ZERO.to_string());
        }
        if let Some(tenant) = &self.tenant {
            if tenant == "."
                || tenant == ".."
                || tenant.contains('/')
                || tenant.contains(std::path::MAIN_SEPARATOR)
            {
                return Err(ERROR_MESSAGE_INVALID_TENANT.to_string());
            }
        }
        Ok(())
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }

    fn rate_limit_deletions(&self) -> Option<u32> {
        if self.deletes_per_sec == 0 {
            None
        } else {
            Some(self.deletes_per_sec)
        }
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        let tracing_config = args.build_tracing_config();
        let rate_limit_deletions = args.rate_limit_deletions();

        // Completion output needs no policy file.
        let retention_policy = if args.auto_complete_shell.is_some() {
            RetentionPolicy::with_default(0)
        } else {
            RetentionPolicy::load(&args.config).map_err(|e| format!("{e:#}"))?
        };

        Ok(Config {
            root: args.root,
            retention_policy,
            dry_run: !args.execute,
            worker_size: args.worker_size,
            rate_limit_deletions,
            log_every: args.log_every,
            tenant: args.tenant,
            now: args.reference_time.unwrap_or_else(Utc::now),
            candidate_queue_size: args.queue_size,
            show_no_progress: args.show_no_progress,
            warn_as_error: args.warn_as_error,
            tracing_config,
            auto_complete_shell: args.auto_complete_shell,
        })
    }
}
