// SPDX-License-Identifier: Apache-2.0

//! `messagebus.*`: the event-bus connection used to publish job/node state transitions, and the
//! subjects those events go out under.

use serde::{Deserialize, Serialize};

/// `messagebus.address` / `username` / `password` / `creds-file-path` / `api-subjects.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MessageBusConfig {
    /// Broker address, e.g. `nats://localhost:4222`.
    pub address: String,
    /// Username for password-based auth. Mutually exclusive with `creds_file_path` in practice,
    /// but left unchecked here; `validate()` on the aggregate config enforces it.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for password-based auth.
    #[serde(default)]
    pub password: Option<String>,
    /// Path to a NATS `.creds` file, used instead of username/password.
    #[serde(default)]
    pub creds_file_path: Option<String>,
    /// Subjects published on for job and node state transitions.
    #[serde(default)]
    pub api_subjects: ApiSubjects,
}

/// Publish subjects for the two event kinds this system emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ApiSubjects {
    /// Subject a job's start/stop/state-change events are published on.
    #[serde(default = "default_subject_job_event")]
    pub subject_job_event: String,
    /// Subject a node's up/down/state-change events are published on.
    #[serde(default = "default_subject_node_state")]
    pub subject_node_state: String,
}

impl Default for ApiSubjects {
    fn default() -> Self {
        ApiSubjects {
            subject_job_event: default_subject_job_event(),
            subject_node_state: default_subject_node_state(),
        }
    }
}

impl MessageBusConfig {
    /// Credential configuration is valid iff exactly one auth method is configured, or none at
    /// all (anonymous connections are allowed for local/dev brokers).
    #[must_use]
    pub fn has_conflicting_auth(&self) -> bool {
        let has_password_auth = self.username.is_some() || self.password.is_some();
        let has_creds_file = self.creds_file_path.is_some();
        has_password_auth && has_creds_file
    }
}

fn default_subject_job_event() -> String {
    "hpcmetrics.job.event".to_owned()
}

fn default_subject_node_state() -> String {
    "hpcmetrics.node.state".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_auth_is_detected() {
        let cfg = MessageBusConfig {
            address: "nats://localhost:4222".into(),
            username: Some("svc".into()),
            password: Some("hunter2".into()),
            creds_file_path: Some("/etc/hpcmetrics/nats.creds".into()),
            api_subjects: ApiSubjects::default(),
        };
        assert!(cfg.has_conflicting_auth());
    }

    #[test]
    fn defaults_cover_both_subjects() {
        let subjects = ApiSubjects::default();
        assert_eq!(subjects.subject_job_event, "hpcmetrics.job.event");
        assert_eq!(subjects.subject_node_state, "hpcmetrics.node.state");
    }
}
