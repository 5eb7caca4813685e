//! The call boundary to the external compression module.
//!
//! An [`Engine`] owns a name-addressed staging area and one compress entry
//! point. Whatever the entry point returns is turned into a
//! [`CompressReport`] by [`Contract::interpret`], so callers never look at
//! raw return codes.

use serde::Deserialize;

use crate::error::CompressionFailure;

/// Return-value convention of the external compress function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Contract {
    /// `(src, dst, quality) -> f64`: fraction of size saved, negative on failure.
    #[default]
    ReductionFraction,
    /// `(src, dst, quality, 0) -> int`: non-zero on success. The saving is
    /// computed from the staged sizes.
    LegacyFlag,
}

/// Arguments of one compress invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressCall<'a> {
    pub source: &'a str,
    pub destination: &'a str,
    pub quality: i32,
    pub contract: Contract,
}

/// Typed outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressReport {
    /// Fraction of the original size eliminated, in `[0, 1]`.
    pub reduction: f64,
    pub input_bytes: usize,
    pub output_bytes: usize,
}

impl CompressReport {
    pub fn space_saved_percent(&self) -> f64 {
        self.reduction * 100.0
    }
}

impl Contract {
    /// Adapts a raw return value to a report.
    ///
    /// `input_bytes` is the staged source length and `output_bytes` the
    /// length of the staged output read back after the call.
    pub fn interpret(
        self,
        source: &str,
        raw: f64,
        input_bytes: usize,
        output_bytes: usize,
    ) -> Result<CompressReport, CompressionFailure> {
        if self.is_failure(raw) {
            return Err(CompressionFailure::Rejected {
                source_name: source.to_string(),
                code: raw,
            });
        }
        let reduction = match self {
            Contract::ReductionFraction => raw.min(1.0),
            Contract::LegacyFlag => size_reduction(input_bytes, output_bytes),
        };
        Ok(CompressReport {
            reduction,
            input_bytes,
            output_bytes,
        })
    }

    /// Whether `raw` already says the call failed, before any output is read.
    pub fn is_failure(self, raw: f64) -> bool {
        match self {
            Contract::ReductionFraction => raw.is_nan() || raw < 0.0,
            Contract::LegacyFlag => raw == 0.0 || raw.is_nan(),
        }
    }
}

/// `1 - output/input`, clamped to `[0, 1]`. An empty input saves nothing.
pub fn size_reduction(input_bytes: usize, output_bytes: usize) -> f64 {
    if input_bytes == 0 {
        return 0.0;
    }
    (1.0 - output_bytes as f64 / input_bytes as f64).clamp(0.0, 1.0)
}

/// Staged storage plus the compress entry point of an external module.
pub trait Engine {
    /// Name of the compress entry point, used in diagnostics.
    fn export(&self) -> &str;

    fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), CompressionFailure>;

    fn read_file(&self, name: &str) -> Result<Vec<u8>, CompressionFailure>;

    /// Deletes a staged file.
    fn remove_file(&self, name: &str) -> Result<(), CompressionFailure>;

    /// Invokes the compressor. The returned number follows `call.contract`;
    /// an `Err` means the call itself could not be made.
    fn compress(&self, call: &CompressCall<'_>) -> Result<f64, CompressionFailure>;
}
