use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, trace};

use retention_cleaner::config::Config;
use retention_cleaner::{
    CLIArgs, RetentionPipeline, create_pipeline_cancellation_token, exit_code_from_error,
};

mod ctrl_c_handler;
pub mod indicator;
mod tracing_init;
pub mod ui_config;

/// retention-cleaner - Removes expired minute directories from a
/// time-partitioned data tree.
///
/// This binary is a thin wrapper over the retention-cleaner library.
#[tokio::main]
async fn main() {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "retention-cleaner",
            &mut std::io::stdout(),
        );

        return;
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    let exit_code = run(config).await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

/// Run the pipeline and map its outcome to a process exit code.
async fn run(config: Config) -> i32 {
    let cancellation_token = create_pipeline_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();
    debug!("retention pipeline start.");

    let mut pipeline = RetentionPipeline::new(config.clone(), cancellation_token.clone());
    let indicator_join_handle = indicator::show_indicator(
        pipeline.get_stats_receiver(),
        ui_config::is_progress_indicator_needed(&config),
        ui_config::is_show_result_needed(&config),
        config.dry_run,
    );

    pipeline.run().await;
    if let Err(e) = indicator_join_handle.await {
        error!("progress indicator task panicked: {}", e);
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());

    if let Some(errors) = pipeline.get_errors_and_consume() {
        let mut exit_code = 0;
        for err in &errors {
            error!("{:#}", err);
            if exit_code == 0 {
                exit_code = exit_code_from_error(err);
            }
        }
        error!(duration_sec = duration_sec, "retention-cleaner failed.");
        return exit_code;
    }

    if cancellation_token.is_cancelled() {
        debug!("retention run cancelled by user.");
    }

    debug!(duration_sec = duration_sec, "retention-cleaner has been completed.");
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use retention_cleaner::config::args::parse_from_args;
    use rusty_fork::rusty_fork_test;
    use std::io::Write;

    fn write_policy() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"retention":{"default":30}}"#).unwrap();
        file
    }

    rusty_fork_test! {
        #[test]
        fn with_tracing() {
            let policy = write_policy();
            let args = vec![
                "retention-cleaner".to_string(),
                "-v".to_string(),
                "--config".to_string(),
                policy.path().to_string_lossy().to_string(),
            ];

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
            assert!(start_tracing_if_necessary(&config));
        }

        #[test]
        fn without_tracing() {
            let policy = write_policy();
            let args = vec![
                "retention-cleaner".to_string(),
                "-qqq".to_string(),
                "--config".to_string(),
                policy.path().to_string_lossy().to_string(),
            ];

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
            assert!(!start_tracing_if_necessary(&config));
        }
    }

    #[tokio::test]
    async fn run_missing_root_exits_with_one() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_policy();
        let args = vec![
            "retention-cleaner".to_string(),
            "--show-no-progress".to_string(),
            "--root".to_string(),
            dir.path().join("missing").to_string_lossy().to_string(),
            "--config".to_string(),
            policy.path().to_string_lossy().to_string(),
        ];

        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
        assert_eq!(run(config).await, 1);
    }

    #[tokio::test]
    async fn run_empty_root_exits_with_zero() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write_policy();
        let args = vec![
            "retention-cleaner".to_string(),
            "--show-no-progress".to_string(),
            "--execute".to_string(),
            "--root".to_string(),
            dir.path().to_string_lossy().to_string(),
            "--config".to_string(),
            policy.path().to_string_lossy().to_string(),
        ];

        let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
        assert_eq!(run(config).await, 0);
    }
}
