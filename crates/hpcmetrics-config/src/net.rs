// SPDX-License-Identifier: Apache-2.0

//! `ingestion.*` and `admin.*`: the two HTTP surfaces this process binds.

use serde::{Deserialize, Serialize};

/// `ingestion.bind-address`: the line-protocol/batch ingestion front door.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct IngestionConfig {
    /// Address the ingestion HTTP server binds, e.g. `0.0.0.0:8081`.
    #[serde(default = "default_ingestion_bind_address")]
    pub bind_address: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        IngestionConfig { bind_address: default_ingestion_bind_address() }
    }
}

/// `admin.bind-address`: the `/healthz` and `/metrics` surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AdminConfig {
    /// Address the admin HTTP server binds, e.g. `127.0.0.1:8082`.
    #[serde(default = "default_admin_bind_address")]
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig { bind_address: default_admin_bind_address() }
    }
}

fn default_ingestion_bind_address() -> String {
    "0.0.0.0:8081".to_owned()
}

fn default_admin_bind_address() -> String {
    "127.0.0.1:8082".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_different_ports() {
        let ingestion = IngestionConfig::default();
        let admin = AdminConfig::default();
        assert_ne!(ingestion.bind_address, admin.bind_address);
    }
}
