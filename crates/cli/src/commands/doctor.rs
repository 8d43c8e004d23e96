use serde::Serialize;
use spectrum_core::config::AppConfig;
use spectrum_core::ingest::load_transactions;
use spectrum_core::InteractionBuilder;

use crate::commands::SessionOptions;

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

pub fn run(options: &SessionOptions, json_output: bool) -> String {
    let report = build_report(options);

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

fn build_report(options: &SessionOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.load_options()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.extend(check_transactions(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "transactions_file",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "interaction_matrix",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
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

fn check_transactions(config: &AppConfig) -> Vec<DoctorCheck> {
    let path = &config.data.transactions_path;
    let lines = match load_transactions(path) {
        Ok(lines) => lines,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "transactions_file",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
                DoctorCheck {
                    name: "interaction_matrix",
                    status: CheckStatus::Skipped,
                    details: "skipped because transactions did not load".to_string(),
                },
            ];
        }
    };

    let data = InteractionBuilder::new().build(&lines);
    let matrix_check = if data.matrix.is_empty() {
        DoctorCheck {
            name: "interaction_matrix",
            status: CheckStatus::Fail,
            details: "no transaction line has both a customer and a product".to_string(),
        }
    } else {
        DoctorCheck {
            name: "interaction_matrix",
            status: CheckStatus::Pass,
            details: format!(
                "{} customers x {} products, {} stored cells, {} lines skipped",
                data.matrix.customer_count(),
                data.matrix.product_count(),
                data.matrix.cell_count(),
                data.report.skipped_lines()
            ),
        }
    };

    vec![
        DoctorCheck {
            name: "transactions_file",
            status: CheckStatus::Pass,
            details: format!("read {} lines from `{}`", lines.len(), path.display()),
        },
        matrix_check,
    ]
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
