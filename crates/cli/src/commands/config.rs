use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use spectrum_core::config::{AppConfig, LogFormat, CONFIG_FILE_NAME};
use toml::Value;

use crate::commands::SessionOptions;

pub fn run(options: &SessionOptions) -> String {
    let config = match AppConfig::load(options.load_options()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let file = FileSource { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let mut lines = vec![
        "effective config (source precedence: flag > env > file > default):".to_string(),
    ];

    let transactions_source = if options.data_path.is_some() {
        "flag (--data)".to_string()
    } else {
        file.attribute("data.transactions_path", &["SPECTRUM_DATA_TRANSACTIONS_PATH"])
    };
    lines.push(render_line(
        "data.transactions_path",
        &config.data.transactions_path.display().to_string(),
        transactions_source,
    ));

    lines.push(render_line(
        "recommendations.default_count",
        &config.recommendations.default_count.to_string(),
        file.attribute("recommendations.default_count", &["SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT"]),
    ));
    lines.push(render_line(
        "recommendations.cache_policy",
        config.recommendations.cache_policy.as_str(),
        file.attribute("recommendations.cache_policy", &["SPECTRUM_RECOMMENDATIONS_CACHE_POLICY"]),
    ));
    lines.push(render_line(
        "recommendations.negative_quantities",
        config.recommendations.negative_quantities.as_str(),
        file.attribute("recommendations.negative_quantities", &["SPECTRUM_RECOMMENDATIONS_NEGATIVE_QUANTITIES"]),
    ));
    lines.push(render_line(
        "recommendations.search_limit",
        &config.recommendations.search_limit.to_string(),
        file.attribute("recommendations.search_limit", &["SPECTRUM_RECOMMENDATIONS_SEARCH_LIMIT"]),
    ));
    lines.push(render_line(
        "recommendations.popular_limit",
        &config.recommendations.popular_limit.to_string(),
        file.attribute("recommendations.popular_limit", &["SPECTRUM_RECOMMENDATIONS_POPULAR_LIMIT"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        file.attribute("server.bind_address", &["SPECTRUM_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        file.attribute("server.port", &["SPECTRUM_SERVER_PORT"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        file.attribute("logging.level", &["SPECTRUM_LOGGING_LEVEL", "SPECTRUM_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        log_format_name(config.logging.format),
        file.attribute("logging.format", &["SPECTRUM_LOGGING_FORMAT", "SPECTRUM_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from(CONFIG_FILE_NAME);
    if root.exists() {
        return Some(root);
    }

    let nested = Path::new("config").join(CONFIG_FILE_NAME);
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

struct FileSource<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl FileSource<'_> {
    fn attribute(&self, key_path: &str, env_keys: &[&str]) -> String {
        field_source(key_path, env_keys, self.doc, self.path)
    }
}

/// The first env key wins, matching the precedence the config loader applies to
/// aliases. Blank env values are ignored by the loader and here.
fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
