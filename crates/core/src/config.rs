use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommend::{CachePolicy, NegativeQuantityPolicy, RecommenderOptions};

pub const CONFIG_FILE_NAME: &str = "spectrum.toml";
pub const MAX_RECOMMENDATION_COUNT: usize = 50;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub recommendations: RecommendationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub transactions_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RecommendationConfig {
    pub default_count: usize,
    pub cache_policy: CachePolicy,
    pub negative_quantities: NegativeQuantityPolicy,
    pub search_limit: usize,
    pub popular_limit: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub transactions_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub default_count: Option<usize>,
    pub cache_policy: Option<CachePolicy>,
    pub negative_quantities: Option<NegativeQuantityPolicy>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig { transactions_path: PathBuf::from("data/retail_data_sample.csv") },
            recommendations: RecommendationConfig::default(),
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_count: crate::recommend::DEFAULT_RECOMMENDATION_COUNT,
            cache_policy: CachePolicy::PerQuery,
            negative_quantities: NegativeQuantityPolicy::Keep,
            search_limit: 50,
            popular_limit: 20,
        }
    }
}

impl RecommendationConfig {
    pub fn recommender_options(&self) -> RecommenderOptions {
        RecommenderOptions {
            cache_policy: self.cache_policy,
            negative_quantities: self.negative_quantities,
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(transactions_path) = data.transactions_path {
                self.data.transactions_path = transactions_path;
            }
        }

        if let Some(recommendations) = patch.recommendations {
            if let Some(default_count) = recommendations.default_count {
                self.recommendations.default_count = default_count;
            }
            if let Some(cache_policy) = recommendations.cache_policy {
                self.recommendations.cache_policy = cache_policy;
            }
            if let Some(negative_quantities) = recommendations.negative_quantities {
                self.recommendations.negative_quantities = negative_quantities;
            }
            if let Some(search_limit) = recommendations.search_limit {
                self.recommendations.search_limit = search_limit;
            }
            if let Some(popular_limit) = recommendations.popular_limit {
                self.recommendations.popular_limit = popular_limit;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SPECTRUM_DATA_TRANSACTIONS_PATH") {
            self.data.transactions_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT") {
            self.recommendations.default_count =
                parse_usize("SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT", &value)?;
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATIONS_CACHE_POLICY") {
            self.recommendations.cache_policy = value.parse()?;
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATIONS_NEGATIVE_QUANTITIES") {
            self.recommendations.negative_quantities = value.parse()?;
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATIONS_SEARCH_LIMIT") {
            self.recommendations.search_limit =
                parse_usize("SPECTRUM_RECOMMENDATIONS_SEARCH_LIMIT", &value)?;
        }
        if let Some(value) = read_env("SPECTRUM_RECOMMENDATIONS_POPULAR_LIMIT") {
            self.recommendations.popular_limit =
                parse_usize("SPECTRUM_RECOMMENDATIONS_POPULAR_LIMIT", &value)?;
        }

        if let Some(value) = read_env("SPECTRUM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SPECTRUM_SERVER_PORT") {
            self.server.port = parse_u16("SPECTRUM_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("SPECTRUM_LOGGING_LEVEL").or_else(|| read_env("SPECTRUM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SPECTRUM_LOGGING_FORMAT").or_else(|| read_env("SPECTRUM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(transactions_path) = overrides.transactions_path {
            self.data.transactions_path = transactions_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(default_count) = overrides.default_count {
            self.recommendations.default_count = default_count;
        }
        if let Some(cache_policy) = overrides.cache_policy {
            self.recommendations.cache_policy = cache_policy;
        }
        if let Some(negative_quantities) = overrides.negative_quantities {
            self.recommendations.negative_quantities = negative_quantities;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_recommendations(&self.recommendations)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.transactions_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data.transactions_path must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendations(recommendations: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendations.default_count == 0
        || recommendations.default_count > MAX_RECOMMENDATION_COUNT
    {
        return Err(ConfigError::Validation(format!(
            "recommendations.default_count must be in range 1..={MAX_RECOMMENDATION_COUNT}"
        )));
    }

    if recommendations.search_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendations.search_limit must be greater than zero".to_string(),
        ));
    }

    if recommendations.popular_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendations.popular_limit must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    recommendations: Option<RecommendationsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    transactions_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationsPatch {
    default_count: Option<usize>,
    cache_policy: Option<CachePolicy>,
    negative_quantities: Option<NegativeQuantityPolicy>,
    search_limit: Option<usize>,
    popular_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::recommend::{CachePolicy, NegativeQuantityPolicy};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.recommendations.default_count == 5, "default count should be five")?;
        ensure(
            config.recommendations.cache_policy == CachePolicy::PerQuery,
            "per-query recomputation should be the default cache policy",
        )?;
        ensure(
            config.recommendations.negative_quantities == NegativeQuantityPolicy::Keep,
            "negative quantities should be kept by default",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SPECTRUM_DATA_DIR", "/srv/retail");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("spectrum.toml");
            fs::write(
                &path,
                r#"
[data]
transactions_path = "${TEST_SPECTRUM_DATA_DIR}/sample.csv"

[recommendations]
cache_policy = "precomputed"
negative_quantities = "clamp"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.transactions_path == PathBuf::from("/srv/retail/sample.csv"),
                "transactions path should be interpolated from environment",
            )?;
            ensure(
                config.recommendations.cache_policy == CachePolicy::Precomputed,
                "cache policy should be read from file",
            )?;
            ensure(
                config.recommendations.negative_quantities == NegativeQuantityPolicy::Clamp,
                "negative quantity policy should be read from file",
            )
        })();

        clear_vars(&["TEST_SPECTRUM_DATA_DIR"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SPECTRUM_LOG_LEVEL", "warn");
        env::set_var("SPECTRUM_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["SPECTRUM_LOG_LEVEL", "SPECTRUM_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SPECTRUM_SERVER_PORT", "9090");
        env::set_var("SPECTRUM_DATA_TRANSACTIONS_PATH", "from-env.csv");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("spectrum.toml");
            fs::write(
                &path,
                r#"
[data]
transactions_path = "from-file.csv"

[server]
port = 7070

[recommendations]
default_count = 8

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    transactions_path: Some(PathBuf::from("from-override.csv")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.transactions_path == PathBuf::from("from-override.csv"),
                "override transactions path should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 9090, "env port should win over file and defaults")?;
            ensure(config.recommendations.default_count == 8, "file count should win over default")
        })();

        clear_vars(&["SPECTRUM_SERVER_PORT", "SPECTRUM_DATA_TRANSACTIONS_PATH"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("recommendations.default_count")
            );
            ensure(has_message, "validation failure should mention recommendations.default_count")
        })();

        clear_vars(&["SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT"]);
        result
    }

    #[test]
    fn invalid_env_values_are_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SPECTRUM_SERVER_PORT", "not-a-port");
        let port_error = AppConfig::load(LoadOptions::default());
        clear_vars(&["SPECTRUM_SERVER_PORT"]);

        env::set_var("SPECTRUM_RECOMMENDATIONS_CACHE_POLICY", "sometimes");
        let policy_error = AppConfig::load(LoadOptions::default());
        clear_vars(&["SPECTRUM_RECOMMENDATIONS_CACHE_POLICY"]);

        ensure(
            matches!(port_error, Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "SPECTRUM_SERVER_PORT"),
            "unparsable port should be an invalid env override",
        )?;
        ensure(
            matches!(policy_error, Err(ConfigError::Validation(ref message)) if message.contains("cache policy")),
            "unknown cache policy should be a validation error",
        )
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let missing = PathBuf::from("definitely/not/here/spectrum.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(ref path)) if *path == missing),
            "missing required file should be reported with its path",
        )
    }
}
