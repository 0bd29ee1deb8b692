//! Report configuration module.
//!
//! Handles loading, validating, and merging `report.toml`. Stock defaults are
//! overridden by the user's file; the request itself may further override the
//! layout section.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [layout]
//! columns = 2               # Figures per row: 1, 2 or 3
//! style = "bordered"        # "plain" or "bordered"
//! border_shape = "rounded"  # "rounded" or "square" (bordered style only)
//!
//! [images]
//! max_dimension = 1600      # Longest edge after normalization, in pixels
//! quality = 85              # JPEG quality (1-100)
//!
//! [processing]
//! strategy = "auto"         # "auto", "pooled" or "inline"
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [output]
//! report_label = "relatorio_fotografico"
//! fallback_name = "sem_instituicao"
//! title = "RELATÓRIO FOTOGRÁFICO"
//! formats = ["pdf", "docx"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{BorderShape, CellStyle, Columns, DocumentFormat, LayoutConfig};
use crate::imaging::{NormalizeSettings, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the config directory.
pub const CONFIG_FILE: &str = "report.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Report configuration loaded from `report.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Default column count and cell style.
    pub layout: LayoutSection,
    /// Normalization settings (bound, JPEG quality).
    pub images: ImagesConfig,
    /// Worker strategy for normalization.
    pub processing: ProcessingConfig,
    /// Artifact naming and formats.
    pub output: OutputConfig,
}

impl ReportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.max_dimension < 16 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be at least 16".into(),
            ));
        }
        if self.output.formats.is_empty() {
            return Err(ConfigError::Validation(
                "output.formats must not be empty".into(),
            ));
        }
        if self.output.report_label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.report_label must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn normalize_settings(&self) -> NormalizeSettings {
        NormalizeSettings {
            max_dimension: self.images.max_dimension,
            quality: Quality::new(self.images.quality),
        }
    }
}

/// Default layout; a request's own layout takes precedence.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutSection {
    pub columns: Columns,
    pub style: CellStyle,
    pub border_shape: BorderShape,
}

impl LayoutSection {
    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig {
            columns: self.columns,
            style: self.style,
        }
    }
}

/// Normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Longest edge of a normalized photo, in pixels.
    pub max_dimension: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        let settings = NormalizeSettings::default();
        Self {
            max_dimension: settings.max_dimension,
            quality: settings.quality.value(),
        }
    }
}

/// Where normalization runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerStrategy {
    /// Worker pool when more than one core is available, inline otherwise.
    #[default]
    Auto,
    /// Always use the worker pool.
    Pooled,
    /// Always normalize on the calling thread.
    Inline,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    pub strategy: NormalizerStrategy,
    /// Maximum number of parallel normalization workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Artifact naming and formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Leading part of every artifact filename.
    pub report_label: String,
    /// Used in place of the institution name when it sanitizes to nothing.
    pub fallback_name: String,
    /// Heading printed at the top of the first page.
    pub title: String,
    /// Which artifacts to produce.
    pub formats: Vec<DocumentFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_label: "relatorio_fotografico".to_string(),
            fallback_name: "sem_instituicao".to_string(),
            title: "RELATÓRIO FOTOGRÁFICO".to_string(),
            formats: vec![DocumentFormat::Pdf, DocumentFormat::Docx],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ReportConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `report.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `report.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ReportConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ReportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `report.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<ReportConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `report.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Report Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Layout (a request's own "layout" object takes precedence)
# ---------------------------------------------------------------------------
[layout]
# Figures per row: 1, 2 or 3. More columns means smaller cells and captions.
columns = 2

# "plain" draws no rule around cells; "bordered" does.
style = "bordered"

# Outline of the rule in bordered style: "rounded" or "square".
border_shape = "rounded"

# ---------------------------------------------------------------------------
# Image normalization
# ---------------------------------------------------------------------------
[images]
# Longest edge of every embedded photo, in pixels. Larger sources are
# downscaled before rotation; smaller ones keep their size.
max_dimension = 1600

# JPEG encoding quality (1 = worst, 100 = best).
quality = 85

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# "auto" uses a worker pool when more than one core is available,
# "pooled" always uses it, "inline" normalizes on the main thread.
strategy = "auto"

# Maximum parallel normalization workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Artifacts are named <report_label>_<institution>.<ext>
report_label = "relatorio_fotografico"

# Used when the institution name has no usable characters.
fallback_name = "sem_instituicao"

# Heading at the top of the first page.
title = "RELATÓRIO FOTOGRÁFICO"

# Which documents to produce.
formats = ["pdf", "docx"]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ReportConfig::default();
        assert_eq!(config.layout.columns, Columns::Two);
        assert_eq!(config.layout.style, CellStyle::Bordered);
        assert_eq!(config.layout.border_shape, BorderShape::Rounded);
        assert_eq!(config.images.max_dimension, 1600);
        assert_eq!(config.images.quality, 85);
        assert_eq!(config.processing.strategy, NormalizerStrategy::Auto);
        assert_eq!(config.output.report_label, "relatorio_fotografico");
        assert_eq!(
            config.output.formats,
            vec![DocumentFormat::Pdf, DocumentFormat::Docx]
        );
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[layout]
columns = 3
"#;
        let config: ReportConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.layout.columns, Columns::Three);
        // Defaults preserved
        assert_eq!(config.layout.style, CellStyle::Bordered);
        assert_eq!(config.images.quality, 85);
    }

    #[test]
    fn parse_rejects_invalid_columns() {
        let result: Result<ReportConfig, _> = toml::from_str("[layout]\ncolumns = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn normalize_settings_follow_images_section() {
        let mut config = ReportConfig::default();
        config.images.max_dimension = 800;
        config.images.quality = 70;
        let settings = config.normalize_settings();
        assert_eq!(settings.max_dimension, 800);
        assert_eq!(settings.quality.value(), 70);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.layout.columns, Columns::Two);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[layout]
style = "plain"

[output]
formats = ["pdf"]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.layout.style, CellStyle::Plain);
        assert_eq!(config.output.formats, vec![DocumentFormat::Pdf]);
        assert_eq!(config.output.report_label, "relatorio_fotografico");
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig::default();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(100_000),
            ..Default::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
            ..Default::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn parse_processing_strategy() {
        let config: ReportConfig =
            toml::from_str("[processing]\nstrategy = \"inline\"\nmax_processes = 2\n").unwrap();
        assert_eq!(config.processing.strategy, NormalizerStrategy::Inline);
        assert_eq!(config.processing.max_processes, Some(2));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_nested_table_merge() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[images]\nquality = 60").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["images"]["quality"].as_integer(), Some(60));
        assert_eq!(merged["images"]["max_dimension"].as_integer(), Some(1600));
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<ReportConfig, _> = toml::from_str("[layout]\ncolumnz = 2\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ReportConfig, _> = toml::from_str("[theme]\nx = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = ReportConfig::default();
        config.images.quality = 100;
        assert!(config.validate().is_ok());
        config.images.quality = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        config.images.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_max_dimension_too_small() {
        let mut config = ReportConfig::default();
        config.images.max_dimension = 8;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_formats_empty() {
        let mut config = ReportConfig::default();
        config.output.formats.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_workers() {
        let mut config = ReportConfig::default();
        config.processing.max_processes = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[images]\nquality = 0").unwrap();
        let result = resolve_config(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: ReportConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = ReportConfig::default();
        assert_eq!(parsed.layout.columns, defaults.layout.columns);
        assert_eq!(parsed.layout.style, defaults.layout.style);
        assert_eq!(parsed.layout.border_shape, defaults.layout.border_shape);
        assert_eq!(parsed.images.max_dimension, defaults.images.max_dimension);
        assert_eq!(parsed.images.quality, defaults.images.quality);
        assert_eq!(parsed.processing.strategy, defaults.processing.strategy);
        assert_eq!(parsed.output.report_label, defaults.output.report_label);
        assert_eq!(parsed.output.fallback_name, defaults.output.fallback_name);
        assert_eq!(parsed.output.title, defaults.output.title);
        assert_eq!(parsed.output.formats, defaults.output.formats);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        for section in ["layout", "images", "processing", "output"] {
            assert!(value.get(section).is_some(), "missing [{section}]");
        }
    }
}
