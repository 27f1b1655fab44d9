use tracing::info;

use crate::commands::{engine, load_config, open_pool, parse_instant, runtime, CommandResult};

/// Runs one due-booking sweep. Exit code 1 when any item failed, timed out or
/// errored, so schedulers can alert on it.
pub fn run(at: Option<&str>) -> CommandResult {
    let at = match parse_instant("sweep", at) {
        Ok(at) => at,
        Err(result) => return result,
    };
    let config = match load_config("sweep") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("sweep") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let engine = engine(&config, &pool)?;
        info!(
            event_name = "cli.sweep.start",
            backend = config.execution.backend.as_str(),
            at = %at,
            "running due booking sweep"
        );
        let report =
            engine.run_due_sweep(at).await.map_err(|error| ("persistence", error.to_string(), 4u8));
        pool.close().await;
        report
    });

    match result {
        Ok(report) if report.failed == 0 => CommandResult::report("sweep", "ok", &report, 0),
        Ok(report) => CommandResult::report("sweep", "partial", &report, 1),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("sweep", error_class, message, exit_code)
        }
    }
}
