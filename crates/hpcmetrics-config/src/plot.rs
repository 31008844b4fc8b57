// SPDX-License-Identifier: Apache-2.0

//! `plot-configuration.*`: cosmetic defaults for the front-end's plots.

use serde::{Deserialize, Serialize};

/// `plot-configuration.color-background` / `plots-per-row` / `line-width` / `color-scheme`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PlotConfig {
    /// Whether plot backgrounds are tinted by threshold (normal/caution/alert).
    #[serde(default = "default_true")]
    pub color_background: bool,
    /// Number of plots laid out per row.
    #[serde(default = "default_plots_per_row")]
    pub plots_per_row: u32,
    /// Line stroke width, in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    /// Named color scheme applied across series.
    #[serde(default = "default_color_scheme")]
    pub color_scheme: Vec<String>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            color_background: true,
            plots_per_row: default_plots_per_row(),
            line_width: default_line_width(),
            color_scheme: default_color_scheme(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_plots_per_row() -> u32 {
    4
}

fn default_line_width() -> u32 {
    2
}

fn default_color_scheme() -> Vec<String> {
    vec!["#00bfff".into(), "#ff8c00".into(), "#32cd32".into(), "#ff1493".into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_non_empty() {
        let cfg = PlotConfig::default();
        assert_eq!(cfg.plots_per_row, 4);
        assert!(!cfg.color_scheme.is_empty());
    }
}
