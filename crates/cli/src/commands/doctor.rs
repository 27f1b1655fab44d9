use serde::Serialize;
use teetime_core::chrono::{Duration, Utc};
use teetime_core::compute_execution_instant;
use teetime_core::config::{AppConfig, BackendKind, LoadOptions};
use teetime_db::connect_with_settings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DEPENDENT_CHECKS: [&str; 4] =
    ["booking_window", "reservation_backend", "sweep_trigger", "database_connectivity"];

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_booking_window(&config));
            checks.push(check_backend(&config));
            checks.push(check_sweep_trigger(&config));
            checks.push(check_database_connectivity(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in DEPENDENT_CHECKS {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Resolves next week's booking window so DST gaps or a bad open time show
/// up before the first sweep.
fn check_booking_window(config: &AppConfig) -> DoctorCheck {
    let name = "booking_window";
    let policy = match config.scheduling.policy() {
        Ok(policy) => policy,
        Err(error) => {
            return DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() }
        }
    };

    let sample_date = (Utc::now() + Duration::days(14)).date_naive();
    match compute_execution_instant(sample_date, &policy.window) {
        Ok(instant) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "tee times on {sample_date} open at {} ({})",
                instant.with_timezone(&policy.window.timezone).format("%Y-%m-%d %H:%M %Z"),
                policy.window.timezone
            ),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() },
    }
}

fn check_backend(config: &AppConfig) -> DoctorCheck {
    match config.execution.backend {
        BackendKind::Mock => DoctorCheck {
            name: "reservation_backend",
            status: CheckStatus::Pass,
            details: format!(
                "mock backend, {} attempt(s) per call, {}s per-item timeout",
                config.execution.retry_max_attempts, config.execution.per_item_timeout_secs
            ),
        },
        BackendKind::Disabled => DoctorCheck {
            name: "reservation_backend",
            status: CheckStatus::Fail,
            details: "execution.backend is disabled; every booking attempt will fail".to_string(),
        },
    }
}

fn check_sweep_trigger(config: &AppConfig) -> DoctorCheck {
    if config.jobs.scheduler_api_key.is_some() {
        DoctorCheck {
            name: "sweep_trigger",
            status: CheckStatus::Pass,
            details: "scheduler api key configured".to_string(),
        }
    } else {
        DoctorCheck {
            name: "sweep_trigger",
            status: CheckStatus::Fail,
            details: "jobs.scheduler_api_key is unset; the sweep endpoint will refuse requests"
                .to_string(),
        }
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
