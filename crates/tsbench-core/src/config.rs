//! Harness configuration.
//!
//! Settings are loaded from a YAML file shaped like:
//!
//! ```yaml
//! databases:
//!   postgres:
//!     url: "host=localhost user=postgres password=postgres dbname=tsbench"
//!   timescale_db:
//!     url: "host=localhost port=5433 user=postgres password=postgres dbname=tsbench"
//!     key_selection: uniform
//! test_cases:
//!   - bulk_insert
//!   - parallel_simple_rw_with_min_records
//! records:
//!   users: 100
//!   devices: 1000
//!   events: 10000
//! min_records: 1000
//! max_records: 100000
//! parallel_readers: 4
//! parallel_writers: 4
//! ```
//!
//! The order of `databases` is the order `test_all` visits them in.

use crate::options::{ExecutorOptions, RecordCounts, DEFAULT_ITERATIONS};
use crate::records::KeySelection;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Semantically invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection parameters for one backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Connection string understood by the backend's client library.
    #[serde(default)]
    pub url: String,

    /// Heading printed above the report (defaults to the configuration key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Connections shared by concurrently running workload tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,

    /// Parent key selection strategy (defaults to the backend's own choice).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_selection: Option<KeySelection>,

    /// Seed for record generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Harness-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Backends keyed by identifier, in execution order.
    #[serde(default)]
    pub databases: IndexMap<String, BackendConfig>,

    /// Test cases run by a full session, in order.
    #[serde(default)]
    pub test_cases: Vec<String>,

    /// Steady-state row counts ensured by `prepare()`.
    #[serde(default)]
    pub records: RecordCounts,

    #[serde(default = "default_min_records")]
    pub min_records: u64,

    #[serde(default = "default_max_records")]
    pub max_records: u64,

    #[serde(default = "default_parallelism")]
    pub parallel_readers: usize,

    #[serde(default = "default_parallelism")]
    pub parallel_writers: usize,

    #[serde(default = "default_iterations")]
    pub iterations: u64,

    #[serde(default = "default_true")]
    pub run_schema_setup: bool,

    #[serde(default = "default_true")]
    pub run_schema_teardown: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Decimal places used by the report.
    #[serde(default = "default_float_precision")]
    pub float_precision: usize,
}

fn default_min_records() -> u64 {
    1_000
}

fn default_max_records() -> u64 {
    100_000
}

fn default_parallelism() -> usize {
    4
}

fn default_iterations() -> u64 {
    DEFAULT_ITERATIONS
}

fn default_true() -> bool {
    true
}

fn default_float_precision() -> usize {
    6
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            databases: IndexMap::new(),
            test_cases: Vec::new(),
            records: RecordCounts::default(),
            min_records: default_min_records(),
            max_records: default_max_records(),
            parallel_readers: default_parallelism(),
            parallel_writers: default_parallelism(),
            iterations: default_iterations(),
            run_schema_setup: true,
            run_schema_teardown: true,
            verbose: false,
            float_precision: default_float_precision(),
        }
    }
}

impl Settings {
    /// Parse and validate settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_records > self.max_records {
            return Err(ConfigError::Invalid(format!(
                "min_records ({}) is greater than max_records ({})",
                self.min_records, self.max_records
            )));
        }

        if let Some(pos) = self.test_cases.iter().position(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "test_cases[{pos}] is empty"
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for name in self.databases.keys() {
            if !seen.insert(normalize_backend_name(name)) {
                return Err(ConfigError::Invalid(format!(
                    "database '{name}' is configured more than once"
                )));
            }
        }

        Ok(())
    }

    /// Look up a backend by name, ignoring case and separators.
    ///
    /// Returns the configuration key together with its parameters.
    pub fn backend(&self, name: &str) -> Option<(&str, &BackendConfig)> {
        let wanted = normalize_backend_name(name);
        self.databases
            .iter()
            .find(|(key, _)| normalize_backend_name(key) == wanted)
            .map(|(key, config)| (key.as_str(), config))
    }

    /// Options handed to every executor built from these settings.
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            run_schema_setup: self.run_schema_setup,
            run_schema_teardown: self.run_schema_teardown,
            verbose: self.verbose,
            parallel_readers: self.parallel_readers,
            parallel_writers: self.parallel_writers,
            min_records: self.min_records,
            max_records: self.max_records,
            records: self.records,
            iterations: self.iterations,
        }
    }
}

/// Canonical form of a backend identifier.
///
/// Lowercases and drops `_`, `-` and spaces, so `TimescaleDb`,
/// `timescale_db` and `timescale-db` all name the same backend.
pub fn normalize_backend_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
databases:
  postgres:
    url: "host=localhost user=postgres password=postgres dbname=tsbench"
  timescale_db:
    url: "host=localhost port=5433 user=postgres dbname=tsbench"
    key_selection: uniform
    pool_size: 16
test_cases:
  - bulk_insert
  - parallel_simple_rw
records:
  users: 10
  devices: 100
min_records: 10
max_records: 20
parallel_readers: 2
parallel_writers: 3
"#;

    #[test]
    fn test_from_yaml() {
        let settings = Settings::from_yaml(YAML).unwrap();

        let keys: Vec<&str> = settings.databases.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["postgres", "timescale_db"]);
        assert_eq!(settings.test_cases, vec!["bulk_insert", "parallel_simple_rw"]);
        assert_eq!(settings.records.users, 10);
        assert_eq!(settings.records.events, 0);
        assert_eq!(settings.parallel_writers, 3);
        // Defaults
        assert_eq!(settings.iterations, 10_000);
        assert_eq!(settings.float_precision, 6);
        assert!(settings.run_schema_setup);

        let timescale = &settings.databases["timescale_db"];
        assert_eq!(timescale.key_selection, Some(KeySelection::Uniform));
        assert_eq!(timescale.pool_size, Some(16));
    }

    #[test]
    fn test_backend_lookup_is_case_insensitive() {
        let settings = Settings::from_yaml(YAML).unwrap();

        let (key, _) = settings.backend("TimescaleDb").unwrap();
        assert_eq!(key, "timescale_db");
        let (key, _) = settings.backend("POSTGRES").unwrap();
        assert_eq!(key, "postgres");
        assert!(settings.backend("click_house").is_none());
    }

    #[test]
    fn test_executor_options() {
        let settings = Settings::from_yaml(YAML).unwrap();
        let options = settings.executor_options();

        assert_eq!(options.parallel_readers, 2);
        assert_eq!(options.parallel_writers, 3);
        assert_eq!(options.min_records, 10);
        assert_eq!(options.max_records, 20);
        assert_eq!(options.records.devices, 100);
    }

    #[test]
    fn test_min_greater_than_max_is_rejected() {
        let err = Settings::from_yaml("min_records: 10\nmax_records: 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_case_name_is_rejected() {
        let err = Settings::from_yaml("test_cases: [bulk_insert, '']\n").unwrap_err();
        assert!(err.to_string().contains("test_cases[1]"));
    }

    #[test]
    fn test_duplicate_backend_is_rejected() {
        let yaml = "databases:\n  maria_db: {url: a}\n  MariaDb: {url: b}\n";
        assert!(Settings::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.databases.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file(Path::new("/nonexistent/tsbench.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_normalize_backend_name() {
        assert_eq!(normalize_backend_name("TimescaleDb"), "timescaledb");
        assert_eq!(normalize_backend_name("timescale_db"), "timescaledb");
        assert_eq!(normalize_backend_name("click-house"), "clickhouse");
    }
}
