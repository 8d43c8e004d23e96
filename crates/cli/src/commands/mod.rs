pub mod config;
pub mod doctor;
pub mod products;
pub mod recommend;

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use spectrum_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use spectrum_core::telemetry::init_logging;
use spectrum_core::AnalyticsSession;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DATA_LOAD: u8 = 3;
pub const EXIT_NOT_FOUND: u8 = 4;
pub const EXIT_INVALID_REQUEST: u8 = 5;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub config_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl SessionOptions {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                transactions_path: self.data_path.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: &impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads config, installs logging and builds the session, or returns the failure
/// result to print.
pub(crate) fn open_session(
    command: &str,
    options: &SessionOptions,
) -> Result<(AppConfig, AnalyticsSession), CommandResult> {
    let config = AppConfig::load(options.load_options()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })?;

    // A subscriber may already be installed when commands run in-process.
    let _ = init_logging(&config.logging);

    let session = AnalyticsSession::load(&config).map_err(|error| {
        CommandResult::failure(command, "data_load", error.to_string(), EXIT_DATA_LOAD)
    })?;
    Ok((config, session))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
