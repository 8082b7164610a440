//! Typed, range-checked pipeline configuration (C11, §4.11).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Xml,
    Csv,
    Txt,
    Pdf,
}

/// Raw, user-supplied configuration before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub default_language: String,
    pub fallback_language: String,
    pub oem: u8,
    pub psm: u8,
    pub confidence_threshold: f64,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub retry_delay_seconds: u32,
    pub output_format: OutputFormat,
    pub max_file_size_mb: u64,
    pub max_concurrency: u32,
    pub batch_size: u32,
    pub max_memory_usage_mb: u64,
    pub enable_watermark_removal: bool,
    pub enable_deskewing: bool,
    pub enable_binarization: bool,
}

impl ProcessingConfig {
    /// Balanced defaults, matching "Default" preset of §4.11.
    pub fn default_preset() -> Self {
        Self {
            default_language: "spa".to_string(),
            fallback_language: "eng".to_string(),
            oem: 3,
            psm: 3,
            confidence_threshold: 0.6,
            timeout_seconds: 120,
            max_retries: 3,
            retry_delay_seconds: 2,
            output_format: OutputFormat::Json,
            max_file_size_mb: 50,
            max_concurrency: 4,
            batch_size: 16,
            max_memory_usage_mb: 2048,
            enable_watermark_removal: true,
            enable_deskewing: true,
            enable_binarization: true,
        }
    }

    /// Favors throughput over thoroughness: higher concurrency, shorter
    /// timeouts, fewer retries.
    pub fn high_performance_preset() -> Self {
        Self {
            max_concurrency: 16,
            batch_size: 64,
            timeout_seconds: 45,
            max_retries: 1,
            retry_delay_seconds: 1,
            confidence_threshold: 0.5,
            max_memory_usage_mb: 4096,
            ..Self::default_preset()
        }
    }

    /// Favors correctness and resource restraint over throughput.
    pub fn conservative_preset() -> Self {
        Self {
            max_concurrency: 2,
            batch_size: 4,
            timeout_seconds: 300,
            max_retries: 5,
            retry_delay_seconds: 5,
            confidence_threshold: 0.8,
            max_memory_usage_mb: 1024,
            ..Self::default_preset()
        }
    }
}

/// Outcome of validating a [`ProcessingConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub validated_config: Option<ProcessingConfig>,
}

/// Validate a raw config, producing hard errors for out-of-range values and
/// soft warnings for suspicious-but-legal ones.
pub fn validate_config(config: ProcessingConfig) -> ConfigValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.default_language.trim().is_empty() {
        errors.push("default_language must not be blank".to_string());
    }
    if config.fallback_language.trim().is_empty() {
        errors.push("fallback_language must not be blank".to_string());
    }
    if config.oem > 3 {
        errors.push(format!("oem must be in 0..=3, got {}", config.oem));
    }
    if config.psm > 13 {
        errors.push(format!("psm must be in 0..=13, got {}", config.psm));
    }
    if !(0.0..=1.0).contains(&config.confidence_threshold) {
        errors.push(format!(
            "confidence_threshold must be in [0,1], got {}",
            config.confidence_threshold
        ));
    } else if config.confidence_threshold < 0.2 {
        warnings.push("confidence_threshold below 0.2 will admit very low-quality extractions".to_string());
    } else if config.confidence_threshold > 0.95 {
        warnings.push("confidence_threshold above 0.95 will route almost everything to manual review".to_string());
    }
    if config.timeout_seconds == 0 || config.timeout_seconds > 3600 {
        errors.push(format!(
            "timeout_seconds must be in (0,3600], got {}",
            config.timeout_seconds
        ));
    }
    if config.max_retries > 10 {
        errors.push(format!("max_retries must be in [0,10], got {}", config.max_retries));
    }
    if config.max_file_size_mb == 0 {
        errors.push("max_file_size_mb must be > 0".to_string());
    }
    if config.max_concurrency == 0 {
        errors.push("max_concurrency must be > 0".to_string());
    } else if config.max_concurrency > 64 {
        warnings.push("max_concurrency above 64 rarely improves throughput and risks resource exhaustion".to_string());
    }
    if config.batch_size == 0 {
        errors.push("batch_size must be > 0".to_string());
    }
    if config.max_memory_usage_mb == 0 {
        errors.push("max_memory_usage_mb must be > 0".to_string());
    } else if config.max_memory_usage_mb < 256 {
        warnings.push("max_memory_usage_mb below 256 may starve OCR workloads".to_string());
    }

    let is_valid = errors.is_empty();
    ConfigValidationReport {
        is_valid,
        errors,
        warnings,
        validated_config: is_valid.then_some(config),
    }
}

/// SLA escalation configuration (§4.9, §6 keys `SLA.EarlyWarningFraction`,
/// `SLA.CriticalFraction`, `Holidays[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaConfig {
    pub early_warning_fraction: f64,
    pub critical_fraction: f64,
    pub holidays: Vec<NaiveDate>,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            early_warning_fraction: 0.33,
            critical_fraction: 0.10,
            holidays: Vec::new(),
        }
    }
}
