/*!
# Overview
retention-cleaner removes expired data from a time-partitioned directory tree.

The tree is laid out as
`<root>/<tenant>/<device>/<year>/<month>/<day>/<hour>/<minute>`. Every
minute directory whose timestamp is older than its tenant's retention window
is removed together with its contents.

## Features
- **Depth-aware walk**: only directories are listed, and the walk never
  descends below the minute level
- **Per-tenant retention**: a JSON policy with a mandatory `default` entry
- **Dry-run by default**: nothing is removed without `--execute`
- **Rate-limited parallel deletion**: a worker pool sharing one token bucket
- **Fault tolerant**: unreadable subtrees and failed deletions are logged and
  counted, never fatal

## As a Library
The `retention-cleaner` CLI is a thin wrapper over this library.

```no_run
use retention_cleaner::config::args::parse_from_args;
use retention_cleaner::{Config, RetentionPipeline, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let args = vec![
        "retention-cleaner",
        "--root",
        "/data",
        "--config",
        "/etc/retention/config.json",
    ];

    let parsed_args = parse_from_args(args).unwrap();
    let config = Config::try_from(parsed_args).unwrap();
    let cancellation_token = create_pipeline_cancellation_token();
    let mut pipeline = RetentionPipeline::new(config, cancellation_token);
    pipeline.close_stats_sender();
    pipeline.run().await;

    if pipeline.has_error() {
        eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
    }
    println!("{:?}", pipeline.get_run_stats());
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod config;
pub mod deleter;
pub mod evaluator;
pub mod pipeline;
pub mod retention;
pub mod stage;
pub mod storage;
pub mod timestamp;
pub mod types;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use config::args::{CLIArgs, build_config_from_args, parse_from_args};
pub use pipeline::RetentionPipeline;
pub use retention::RetentionPolicy;
pub use types::error::{RetentionError, exit_code_from_error};
pub use types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};
pub use types::{RetentionStatistics, RunStats};
