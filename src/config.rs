use serde::Deserialize;

use crate::engine::Contract;
use crate::error::ConfigError;

/// Page wiring and call-boundary settings for the demo.
///
/// Every field has a default, so `new CompressionDemo()` and
/// `new CompressionDemo({ outputName: "small.jpg" })` are both valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DemoConfig {
    /// File `<input>` element id
    pub input_id: String,
    /// Range `<input>` element id
    pub quality_id: String,
    /// Element mirroring the slider value
    pub quality_label_id: String,
    /// Button starting a run
    pub trigger_id: String,
    /// `<a>` used for the download
    pub download_id: String,
    /// `<img>` showing the result
    pub preview_id: String,
    /// Element receiving the space-saved text
    pub rate_id: String,

    /// Global factory created by the Emscripten `MODULARIZE` build.
    pub module_factory: String,
    /// Exported C function invoked through `ccall`.
    pub compress_export: String,
    pub contract: Contract,

    /// Staged output name, reused by every run. Also the download file name.
    pub output_name: String,
    pub output_mime: String,
    /// Used when the slider value is not an integer.
    pub default_quality: i32,
    pub log_level: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            input_id: "input".into(),
            quality_id: "quality".into(),
            quality_label_id: "qval".into(),
            trigger_id: "compress".into(),
            download_id: "download".into(),
            preview_id: "preview".into(),
            rate_id: "rate".into(),
            module_factory: "MozJPEG".into(),
            compress_export: "wasm_compress".into(),
            contract: Contract::ReductionFraction,
            output_name: "out.jpg".into(),
            output_mime: "image/jpeg".into(),
            default_quality: 75,
            log_level: "info".into(),
        }
    }
}

impl DemoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("inputId", &self.input_id),
            ("qualityId", &self.quality_id),
            ("qualityLabelId", &self.quality_label_id),
            ("triggerId", &self.trigger_id),
            ("downloadId", &self.download_id),
            ("previewId", &self.preview_id),
            ("rateId", &self.rate_id),
            ("moduleFactory", &self.module_factory),
            ("compressExport", &self.compress_export),
            ("outputName", &self.output_name),
            ("outputMime", &self.output_mime),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Empty(*key));
        }
        if !(1..=100).contains(&self.default_quality) {
            return Err(ConfigError::QualityOutOfRange(self.default_quality));
        }
        Ok(())
    }

    /// Maps `log_level` onto a `log` level, falling back to `Info`.
    pub fn level(&self) -> log::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => log::Level::Trace,
            "debug" => log::Level::Debug,
            "warn" => log::Level::Warn,
            "error" => log::Level::Error,
            _ => log::Level::Info,
        }
    }
}
