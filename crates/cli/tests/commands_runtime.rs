use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use spectrum_cli::commands::{config, doctor, products, recommend, SessionOptions};
use spectrum_cli::PopularityMetric;
use tempfile::TempDir;

const TRANSACTIONS: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country,TotalAmount
536520,22730,ALARM CLOCK BAKELIKE GREEN,1,2010-12-01 12:43:00,3.75,14729.0,United Kingdom,3.75
536520,22729,ALARM CLOCK BAKELIKE RED,1,2010-12-01 12:43:00,3.75,14729.0,United Kingdom,3.75
536522,22730,ALARM CLOCK BAKELIKE GREEN,2,2010-12-01 12:49:00,3.75,15012.0,United Kingdom,7.5
536522,22729,ALARM CLOCK BAKELIKE RED,2,2010-12-01 12:49:00,3.75,15012.0,United Kingdom,7.5
536530,22423,REGENCY CAKESTAND 3 TIER,5,2010-12-01 13:21:00,12.75,17905.0,United Kingdom,63.75
536531,21931,JUMBO STORAGE BAG SUKI,3,2010-12-01 13:23:00,1.95,,United Kingdom,5.85
";

#[test]
fn recommend_returns_ranked_products() {
    with_transactions(|options| {
        let result = recommend::run(options, "ALARM CLOCK BAKELIKE GREEN", Some(2));
        assert_eq!(result.exit_code, 0, "expected successful recommendation");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["status"], "ok");

        let recommendations = payload["data"]["recommendations"]
            .as_array()
            .expect("recommendations should be an array");
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0]["product"], "ALARM CLOCK BAKELIKE RED");
        assert_eq!(recommendations[0]["rank"], 1);
        assert_eq!(recommendations[0]["similarity_score"].as_f64(), Some(1.0));
        assert_eq!(recommendations[1]["product"], "REGENCY CAKESTAND 3 TIER");
        assert_eq!(recommendations[1]["similarity_score"].as_f64(), Some(0.0));
        assert_eq!(payload["data"]["product_info"]["unique_customers"], 2);
    });
}

#[test]
fn recommend_reports_unknown_product() {
    with_transactions(|options| {
        let result = recommend::run(options, "GLASS STAR FROSTED T-LIGHT HOLDER", None);
        assert_eq!(result.exit_code, 4, "expected product-not-found exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "product_not_found");
    });
}

#[test]
fn recommend_rejects_zero_count() {
    with_transactions(|options| {
        let result = recommend::run(options, "ALARM CLOCK BAKELIKE GREEN", Some(0));
        assert_eq!(result.exit_code, 5, "expected invalid request exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_request");
    });
}

#[test]
fn missing_transactions_file_is_a_data_load_failure() {
    with_env(&[], || {
        let options = SessionOptions {
            config_path: None,
            data_path: Some(PathBuf::from("does/not/exist.csv")),
        };

        let result = recommend::run(&options, "ALARM CLOCK BAKELIKE GREEN", None);
        assert_eq!(result.exit_code, 3, "expected data load failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["error_class"], "data_load");
    });
}

#[test]
fn invalid_env_override_is_a_config_failure() {
    with_env(&[("SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT", "many")], || {
        let result = products::search(&SessionOptions::default(), Some("clock"), None);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn products_search_matches_case_insensitively() {
    with_transactions(|options| {
        let result = products::search(options, Some("bakelike"), None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let matches = payload["data"].as_array().expect("products should be an array");
        let names: Vec<&str> = matches.iter().filter_map(|item| item["product"].as_str()).collect();
        assert_eq!(names, ["ALARM CLOCK BAKELIKE GREEN", "ALARM CLOCK BAKELIKE RED"]);
    });
}

#[test]
fn popular_ranks_by_revenue_and_customers() {
    with_transactions(|options| {
        let by_revenue = parse_payload(&products::popular(options, Some(1), PopularityMetric::Revenue).output);
        assert_eq!(by_revenue["data"][0]["product"], "REGENCY CAKESTAND 3 TIER");

        let by_customers =
            parse_payload(&products::popular(options, Some(1), PopularityMetric::Customers).output);
        assert_eq!(by_customers["data"][0]["product"], "ALARM CLOCK BAKELIKE GREEN");
    });
}

#[test]
fn info_reports_product_statistics() {
    with_transactions(|options| {
        let result = products::info(options, "REGENCY CAKESTAND 3 TIER");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["total_quantity"], 5);
        assert_eq!(payload["data"]["unique_customers"], 1);

        let customerless = products::info(options, "JUMBO STORAGE BAG SUKI");
        assert_eq!(customerless.exit_code, 0, "lines without a customer still count in statistics");
        let payload = parse_payload(&customerless.output);
        assert_eq!(payload["data"]["total_quantity"], 3);
        assert_eq!(payload["data"]["unique_customers"], 0);

        let not_recommendable = recommend::run(options, "JUMBO STORAGE BAG SUKI", None);
        assert_eq!(not_recommendable.exit_code, 4, "product without customers has no matrix column");

        let missing = products::info(options, "PAPER CHAIN KIT 50'S CHRISTMAS");
        assert_eq!(missing.exit_code, 4);
    });
}

#[test]
fn config_report_attributes_flag_and_env_sources() {
    with_env(&[("SPECTRUM_SERVER_PORT", "9090")], || {
        let options = SessionOptions {
            config_path: None,
            data_path: Some(PathBuf::from("fixtures/sales.csv")),
        };

        let output = config::run(&options);
        assert!(output.contains("- data.transactions_path = fixtures/sales.csv (source: flag (--data))"));
        assert!(output.contains("- server.port = 9090 (source: env (SPECTRUM_SERVER_PORT))"));
        assert!(output.contains("- recommendations.cache_policy = per_query (source: default)"));
    });
}

#[test]
fn doctor_json_reports_readiness() {
    with_transactions(|options| {
        let payload = parse_payload(&doctor::run(options, true));
        assert_eq!(payload["overall_status"], "pass");

        let checks = payload["checks"].as_array().expect("checks should be an array");
        let names: Vec<&str> = checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(names, ["config_validation", "transactions_file", "interaction_matrix"]);
        assert_eq!(
            checks[2]["details"],
            "3 customers x 3 products, 5 stored cells, 1 lines skipped"
        );
    });
}

#[test]
fn config_report_attributes_logging_aliases() {
    with_env(&[("SPECTRUM_LOG_LEVEL", "debug"), ("SPECTRUM_LOG_FORMAT", "json")], || {
        let output = config::run(&SessionOptions::default());
        assert!(output.contains("- logging.level = debug (source: env (SPECTRUM_LOG_LEVEL))"));
        assert!(output.contains("- logging.format = json (source: env (SPECTRUM_LOG_FORMAT))"));
    });

    with_env(&[("SPECTRUM_LOGGING_LEVEL", "warn"), ("SPECTRUM_LOG_LEVEL", "debug")], || {
        let output = config::run(&SessionOptions::default());
        assert!(output.contains("- logging.level = warn (source: env (SPECTRUM_LOGGING_LEVEL))"));
    });
}

#[test]
fn doctor_skips_data_checks_when_config_invalid() {
    with_env(&[("SPECTRUM_SERVER_PORT", "not-a-port")], || {
        let payload = parse_payload(&doctor::run(&SessionOptions::default(), true));
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_transactions(test_fn: impl FnOnce(&SessionOptions)) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("retail_data_sample.csv");
    fs::write(&path, TRANSACTIONS).expect("write transactions fixture");
    let options = SessionOptions { config_path: None, data_path: Some(path) };

    with_env(&[], || test_fn(&options));
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SPECTRUM_DATA_TRANSACTIONS_PATH",
        "SPECTRUM_RECOMMENDATIONS_DEFAULT_COUNT",
        "SPECTRUM_RECOMMENDATIONS_CACHE_POLICY",
        "SPECTRUM_RECOMMENDATIONS_NEGATIVE_QUANTITIES",
        "SPECTRUM_RECOMMENDATIONS_SEARCH_LIMIT",
        "SPECTRUM_RECOMMENDATIONS_POPULAR_LIMIT",
        "SPECTRUM_SERVER_BIND_ADDRESS",
        "SPECTRUM_SERVER_PORT",
        "SPECTRUM_LOGGING_LEVEL",
        "SPECTRUM_LOGGING_FORMAT",
        "SPECTRUM_LOG_LEVEL",
        "SPECTRUM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
