// SPDX-License-Identifier: Apache-2.0

//! Layered, validated configuration for the job-monitoring control plane.
//!
//! A single [`Config`] document is loaded from a YAML or JSON file via [`Config::from_file`],
//! then checked with [`Config::validate`], which collects every violation found rather than
//! bailing out on the first one — an operator fixing a broken config gets the whole list in one
//! round trip instead of playing whack-a-mole.

pub mod archive;
pub mod byte_units;
pub mod cleanup;
pub mod error;
pub mod messagebus;
pub mod metric_config;
pub mod net;
pub mod plot;
pub mod resampling;
pub mod ui;
pub mod workers;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use archive::{ArchiveConfig, ArchiveKind};
pub use cleanup::{CleanupConfig, CleanupMode, HumanDuration};
pub use error::ConfigError;
pub use messagebus::{ApiSubjects, MessageBusConfig};
pub use metric_config::{ClusterMetricConfig, MetricConfig, SubClusterMetricConfig};
pub use net::{AdminConfig, IngestionConfig};
pub use plot::PlotConfig;
pub use resampling::ResamplingConfig;
pub use ui::{JobListConfig, JobViewConfig, NodeListConfig};
pub use workers::WorkersConfig;

/// The complete configuration document for one `hpcmetricsd` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// Names of the clusters this instance monitors. Every cluster referenced elsewhere in the
    /// document (metric overrides, retention overrides) must appear here.
    pub clusters: Vec<String>,
    /// Ingestion HTTP front door.
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Admin HTTP surface (`/healthz`, `/metrics`).
    #[serde(default)]
    pub admin: AdminConfig,
    /// Archive backend selection and connection details.
    pub archive: ArchiveConfig,
    /// Retention/cleanup worker policy.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Dispatcher resampling thresholds.
    #[serde(default)]
    pub resampling: ResamplingConfig,
    /// Periodic reconciliation worker intervals.
    #[serde(default)]
    pub workers: WorkersConfig,
    /// Event bus used for job/node state notifications. Absent means no events are published.
    #[serde(default)]
    pub messagebus: Option<MessageBusConfig>,
    /// Metric lists shown in the job list, job view plot, and job view table.
    #[serde(default)]
    pub metric_config: MetricConfig,
    /// Job list display defaults.
    #[serde(default)]
    pub job_list: JobListConfig,
    /// Node list display defaults.
    #[serde(default)]
    pub node_list: NodeListConfig,
    /// Job view display defaults.
    #[serde(default)]
    pub job_view: JobViewConfig,
    /// Plot cosmetic defaults.
    #[serde(default)]
    pub plot_configuration: PlotConfig,
}

impl Config {
    /// Loads a configuration document from `path`, dispatching on its extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be read, [`ConfigError::UnsupportedExtension`]
    /// if the extension is neither `.yaml`/`.yml` nor `.json`, or [`ConfigError::Deserialize`] if
    /// the contents don't parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::FileRead { path: path.display().to_string(), source })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&contents),
            Some("json") => Self::from_json(&contents),
            other => Err(ConfigError::UnsupportedExtension(
                other.map_or_else(|| path.display().to_string(), ToOwned::to_owned),
            )),
        }
    }

    /// Parses a configuration document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Deserialize`] if the document doesn't parse, including any unknown
    /// key rejected by `deny_unknown_fields`.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents)
            .map_err(|source| ConfigError::Deserialize { format: "YAML", details: source.to_string() })
    }

    /// Parses a configuration document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Deserialize`] if the document doesn't parse, including any unknown
    /// key rejected by `deny_unknown_fields`.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents)
            .map_err(|source| ConfigError::Deserialize { format: "JSON", details: source.to_string() })
    }

    /// Cross-field validation that a single serde pass cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] carrying every violation found, never just the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.clusters.is_empty() {
            errors.push("clusters must list at least one cluster".to_owned());
        }

        errors.extend(self.archive.check());

        for cluster in self.metric_config.clusters.keys() {
            if !self.clusters.contains(cluster) {
                errors.push(format!("metric-config.clusters references unknown cluster '{cluster}'"));
            }
        }

        for cluster in self.cleanup.cluster_overrides.keys() {
            if !self.clusters.contains(cluster) {
                errors.push(format!("cleanup.cluster-overrides references unknown cluster '{cluster}'"));
            }
        }

        if let Some(bus) = &self.messagebus {
            if bus.has_conflicting_auth() {
                errors.push("messagebus cannot use both password auth and a creds file".to_owned());
            }
        }

        if self.resampling.resolutions.is_empty() {
            errors.push("resampling.resolutions must not be empty".to_owned());
        }

        if errors.is_empty() { Ok(()) } else { Err(ConfigError::Invalid { errors }) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r"
clusters:
  - fritz
archive:
  kind: fs
  path: /var/lib/hpcmetrics/archive
"
    }

    #[test]
    fn parses_minimal_document_with_defaults() {
        let cfg = Config::from_yaml(minimal_yaml()).expect("minimal document should parse");
        assert_eq!(cfg.clusters, vec!["fritz".to_owned()]);
        assert_eq!(cfg.ingestion.bind_address, "0.0.0.0:8081");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_cluster_list() {
        let yaml = r"
clusters: []
archive:
  kind: fs
  path: /var/lib/hpcmetrics/archive
";
        let cfg = Config::from_yaml(yaml).expect("should parse");
        let err = cfg.validate().expect_err("empty cluster list should fail validation");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn collects_multiple_validation_errors_at_once() {
        let yaml = r"
clusters: []
archive:
  kind: object-store
";
        let cfg = Config::from_yaml(yaml).expect("should parse");
        let ConfigError::Invalid { errors } = cfg.validate().expect_err("should fail") else {
            panic!("expected Invalid variant");
        };
        assert!(errors.len() >= 2, "expected both the empty-cluster and missing-bucket errors, got {errors:?}");
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let yaml = format!("{}\nbogus-key: 1\n", minimal_yaml());
        let err = Config::from_yaml(&yaml).expect_err("unknown key should be rejected");
        assert!(matches!(err, ConfigError::Deserialize { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "clusters = []").expect("write");
        let err = Config::from_file(&path).expect_err("toml should be unsupported");
        assert!(matches!(err, ConfigError::UnsupportedExtension(_)));
    }

    #[test]
    fn loads_from_yaml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, minimal_yaml()).expect("write");
        let cfg = Config::from_file(&path).expect("should load");
        assert_eq!(cfg.clusters, vec!["fritz".to_owned()]);
    }
}
